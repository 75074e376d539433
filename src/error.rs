use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown order status: {0}")]
    UnknownStatus(String),
}

/// Failures that end a camera session before it produced anything. The
/// messages are shown to the operator as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("Accès caméra non supporté sur ce poste.")]
    Unsupported,
    #[error("Accès à la caméra refusé.")]
    PermissionDenied,
    #[error("Aucune caméra détectée.")]
    NoDevice,
    #[error("Impossible de charger la librairie de lecture code-barres.")]
    BackendLoad,
    #[error("Bibliothèque de décodage indisponible.")]
    BackendUnavailable,
    #[error("{0}")]
    Device(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("\"{0}\" est en rupture de stock.")]
    OutOfStock(String),
    #[error("Quantité maximale atteinte par rapport au stock disponible.")]
    MaxQuantityReached,
    #[error("Produit introuvable.")]
    UnknownProduct,
}
