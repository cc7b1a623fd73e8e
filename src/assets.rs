use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};

/// Service for the built frontend bundle. Paths that match no file fall
/// back to the SPA index page.
pub fn spa_service(frontend_dir: &str) -> ServeDir<ServeFile> {
    let dir = Path::new(frontend_dir);
    ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")))
}
