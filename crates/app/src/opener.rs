use async_trait::async_trait;
use forum_view_core::{DocumentOpener, OpenError};
use forum_view_core::url::Url;
use tokio::process::Command;

/// Opens documents with the platform's default handler, or with `program`
/// when one is configured.
#[derive(Debug, Clone, Default)]
pub struct BrowserOpener {
    program: Option<String>,
}

impl BrowserOpener {
    pub fn new(program: Option<String>) -> Self {
        Self {
            program: program.filter(|program| !program.trim().is_empty()),
        }
    }

    fn command(&self, url: &Url) -> (String, Vec<String>) {
        if let Some(program) = &self.program {
            return (program.clone(), vec![url.to_string()]);
        }

        if cfg!(target_os = "macos") {
            ("open".to_string(), vec![url.to_string()])
        } else if cfg!(target_os = "windows") {
            (
                "cmd".to_string(),
                vec![
                    "/C".to_string(),
                    "start".to_string(),
                    String::new(),
                    url.to_string(),
                ],
            )
        } else {
            ("xdg-open".to_string(), vec![url.to_string()])
        }
    }
}

#[async_trait]
impl DocumentOpener for BrowserOpener {
    async fn open(&self, url: &Url) -> Result<(), OpenError> {
        let (program, args) = self.command(url);
        let status = Command::new(&program)
            .args(&args)
            .status()
            .await
            .map_err(|error| OpenError::Launch(format!("{program}: {error}")))?;

        if !status.success() {
            return Err(OpenError::Launch(format!("{program} exited with {status}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_program_receives_url() -> Result<(), Box<dyn std::error::Error>> {
        let opener = BrowserOpener::new(Some("firefox".to_string()));
        let url = Url::parse("http://x/a.pdf")?;
        let (program, args) = opener.command(&url);
        assert_eq!(program, "firefox");
        assert_eq!(args, vec!["http://x/a.pdf".to_string()]);
        Ok(())
    }

    #[test]
    fn blank_program_falls_back_to_platform_default() -> Result<(), Box<dyn std::error::Error>> {
        let opener = BrowserOpener::new(Some("  ".to_string()));
        let url = Url::parse("http://x/a.pdf")?;
        let (program, args) = opener.command(&url);
        assert_ne!(program.trim(), "");
        assert_eq!(args.last().map(String::as_str), Some("http://x/a.pdf"));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_program_is_reported() -> Result<(), Box<dyn std::error::Error>> {
        let opener = BrowserOpener::new(Some("false".to_string()));
        let url = Url::parse("http://x/a.pdf")?;
        let result = opener.open(&url).await;
        assert!(matches!(result, Err(OpenError::Launch(_))));
        Ok(())
    }
}
