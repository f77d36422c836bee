//! Frontend bootstrap.
//!
//! A project without its frontend directory gets a minimal Vite + TypeScript
//! app, embedded in the binary and written out on first `flux dev`.

use std::fs;
use std::path::Path;

use rust_embed::RustEmbed;

use crate::error::DevError;

#[derive(RustEmbed)]
#[folder = "templates/frontend/"]
struct FrontendTemplate;

/// Placeholder replaced with the project name in text templates.
pub const NAME_PLACEHOLDER: &str = "{{name}}";

/// Creates a frontend directory from scratch.
pub trait Scaffolder: Send + Sync {
    /// Populate `dir`, which does not exist yet. Returns the number of files
    /// written.
    fn scaffold(&self, dir: &Path, name: &str) -> Result<usize, DevError>;
}

/// Writes the embedded Vite template.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateScaffolder;

impl Scaffolder for TemplateScaffolder {
    fn scaffold(&self, dir: &Path, name: &str) -> Result<usize, DevError> {
        let fail = |message: String| DevError::Scaffold {
            path: dir.to_path_buf(),
            message,
        };

        let mut written = 0;
        for file in FrontendTemplate::iter() {
            let Some(asset) = FrontendTemplate::get(&file) else {
                continue;
            };
            let target = dir.join(file.as_ref());
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
            }

            let contents = match std::str::from_utf8(asset.data.as_ref()) {
                Ok(text) => text.replace(NAME_PLACEHOLDER, name).into_bytes(),
                Err(_) => asset.data.to_vec(),
            };
            fs::write(&target, contents)
                .map_err(|e| fail(format!("{}: {e}", target.display())))?;
            written += 1;
        }

        if written == 0 {
            return Err(fail("no template files are embedded".to_string()));
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_the_whole_template() {
        let dir = TempDir::new().unwrap();
        let frontend = dir.path().join("frontend");

        let written = TemplateScaffolder.scaffold(&frontend, "shop").unwrap();

        assert!(written >= 4);
        assert!(frontend.join("package.json").is_file());
        assert!(frontend.join("index.html").is_file());
        assert!(frontend.join("src/main.ts").is_file());
    }

    #[test]
    fn substitutes_the_project_name() {
        let dir = TempDir::new().unwrap();
        let frontend = dir.path().join("web");
        TemplateScaffolder.scaffold(&frontend, "shop").unwrap();

        let package = fs::read_to_string(frontend.join("package.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&package).unwrap();
        assert_eq!(parsed["name"], "shop-frontend");
        assert_eq!(parsed["scripts"]["dev"], "vite");

        let html = fs::read_to_string(frontend.join("index.html")).unwrap();
        assert!(html.contains("<title>shop</title>"));
        assert!(!html.contains(NAME_PLACEHOLDER));
    }
}
