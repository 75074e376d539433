fn main() {
    #[cfg(feature = "gui")]
    slint_build::compile("ui/main.slint").expect("failed to compile ui/main.slint");
}
