//! CommandCaptioner - 外部プログラムでキャプションを描画
//!
//! `program [args...] <source> <dest> <line>...` を起動し、終了コード 0 を成功とみなします。
//! タイムアウト・非ゼロ終了・起動失敗はすべて `CapbotError::Caption`（Transient）です。

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::CaptionerConfig;
use crate::error::CapbotError;
use crate::ports::Captioner;

pub struct CommandCaptioner {
    config: CaptionerConfig,
}

impl CommandCaptioner {
    pub fn new(config: CaptionerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Captioner for CommandCaptioner {
    async fn caption(
        &self,
        source: &Path,
        lines: &[String],
        dest: &Path,
    ) -> Result<(), CapbotError> {
        let failed = |reason: String| CapbotError::Caption {
            dest: dest.to_path_buf(),
            reason,
        };

        tracing::debug!(program = %self.config.program, source = %source.display(), dest = %dest.display(), "spawning captioner");
        let child = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(source)
            .arg(dest)
            .args(lines)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| failed(format!("failed to spawn {}: {e}", self.config.program)))?;

        let output = tokio::time::timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| failed(format!("timed out after {:?}", self.config.timeout)))?
            .map_err(|e| failed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn captioner(program: &str, args: &[&str]) -> CommandCaptioner {
        CommandCaptioner::new(CaptionerConfig {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout: Duration::from_secs(5),
        })
    }

    #[tokio::test]
    async fn zero_exit_is_success() {
        let c = captioner("true", &[]);
        c.caption(Path::new("in.png"), &["line".into()], Path::new("out.png"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_caption_error() {
        let c = captioner("false", &[]);
        let err = c
            .caption(Path::new("in.png"), &[], Path::new("out.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, CapbotError::Caption { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn missing_program_is_a_caption_error() {
        let c = captioner("/nonexistent/caption-render", &[]);
        let err = c
            .caption(Path::new("in.png"), &[], Path::new("out.png"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[tokio::test]
    async fn arguments_are_source_dest_then_lines() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.txt");
        // sh -c <script> render <source> <dest> <lines...>
        let c = captioner("sh", &["-c", "printf '%s|' \"$@\" > \"$2\"", "render"]);
        c.caption(Path::new("src.png"), &["a".into(), "b c".into()], &dest)
            .await
            .unwrap();
        let written = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(written, format!("src.png|{}|a|b c|", dest.display()));
    }
}
