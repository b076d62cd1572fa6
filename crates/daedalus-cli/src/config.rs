use std::path::Path;

/// Loads `.env` from the crate directory and then the working directory.
///
/// Must run before argument parsing so `env` defaults see the values.
pub fn init() {
    let _ = dotenvy::from_path(Path::new(
        format!("{}/.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}
