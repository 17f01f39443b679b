//! Out-of-process runner for model-written processing scripts.
//!
//! A script runs in the configured interpreter with a cleared environment
//! (only `PATH` survives), a throwaway working directory and no stdin. Its
//! one capability is the output path passed as the last argument; anything
//! else it writes is discarded with the working directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;

use crate::config::AppConfig;
use crate::core::{Error, Result};
use crate::imaging::{process_heightmap, save_heightmap, timestamp};

const SCRIPT_NAME: &str = "script.py";
const OUTPUT_NAME: &str = "output.png";
/// Trailing stderr kept in error messages.
const STDERR_TAIL: usize = 2000;

/// Interpreter invocation for one script.
#[derive(Clone, Debug)]
pub struct Sandbox {
    interpreter: String,
    args: Vec<String>,
}

/// A finished run whose output file exists.
#[derive(Debug)]
pub struct ScriptRun {
    /// The produced image, still inside `workdir`.
    pub output: PathBuf,
    pub stdout: String,
    pub stderr: String,
    workdir: TempDir,
}

impl ScriptRun {
    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }
}

fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

impl Sandbox {
    pub fn new(interpreter: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            args,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.script_interpreter.clone(), config.script_args.clone())
    }

    /// Run `code` and return its output file.
    pub fn run(&self, code: &str) -> Result<ScriptRun> {
        let workdir = TempDir::new()?;
        let script = workdir.path().join(SCRIPT_NAME);
        let output = workdir.path().join(OUTPUT_NAME);
        std::fs::write(&script, code)?;

        let mut cmd = Command::new(&self.interpreter);
        cmd.args(&self.args)
            .arg(&script)
            .arg(&output)
            .current_dir(workdir.path())
            .env_clear()
            .stdin(Stdio::null());
        if let Some(path) = std::env::var_os("PATH") {
            cmd.env("PATH", path);
        }

        log::info!("Running script with {} in {}", self.interpreter, workdir.path().display());
        let result = cmd
            .output()
            .map_err(|e| Error::Sandbox(format!("could not start {}: {}", self.interpreter, e)))?;
        let stdout = String::from_utf8_lossy(&result.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&result.stderr).into_owned();
        if !stdout.trim().is_empty() {
            log::debug!("Script stdout:\n{}", stdout.trim_end());
        }

        if !result.status.success() {
            return Err(Error::Sandbox(format!(
                "{} ({})",
                result.status,
                tail(stderr.trim(), STDERR_TAIL)
            )));
        }
        if !output.is_file() {
            return Err(Error::Sandbox(format!("script wrote no {}", OUTPUT_NAME)));
        }
        Ok(ScriptRun {
            output,
            stdout,
            stderr,
            workdir,
        })
    }
}

/// Run a heightmap script and save its result through the normal
/// heightmap post-processing.
pub fn run_heightmap_script(config: &AppConfig, code: &str) -> Result<PathBuf> {
    let run = Sandbox::from_config(config).run(code)?;
    let img = image::open(&run.output)
        .map_err(|e| Error::Sandbox(format!("output is not an image: {}", e)))?;
    let gray = process_heightmap(&img, &config.heightmap);
    save_heightmap(&config.output_dir, &timestamp(chrono::Local::now()), &gray)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sh() -> Sandbox {
        Sandbox::new("sh", Vec::new())
    }

    #[test]
    fn test_failing_script() {
        let err = sh().run("echo oops >&2\nexit 3\n").unwrap_err();
        match err {
            Error::Sandbox(msg) => assert!(msg.contains("oops"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_output() {
        assert!(matches!(sh().run("echo hello\n"), Err(Error::Sandbox(_))));
    }

    #[test]
    fn test_environment_is_cleared() {
        // SAFETY: tests in this module do not read this variable concurrently
        unsafe { std::env::set_var("TERRAIN_AI_SANDBOX_PROBE", "leak") };
        let run = sh()
            .run("echo \"[$TERRAIN_AI_SANDBOX_PROBE]\"\npwd\ntouch \"$1\"\n")
            .unwrap();
        assert!(run.stdout.starts_with("[]"));
        assert!(run.output.starts_with(run.workdir()));
    }

    #[test]
    fn test_missing_interpreter() {
        let sandbox = Sandbox::new("definitely-not-an-interpreter", Vec::new());
        assert!(matches!(sandbox.run(""), Err(Error::Sandbox(_))));
    }

    #[test]
    fn test_heightmap_script_is_post_processed() {
        let temp_dir = tempfile::TempDir::new().expect("failed to create temp dir");
        let source = temp_dir.path().join("src.png");
        RgbImage::from_fn(40, 20, |x, _| Rgb([(x * 6) as u8, 0, 0])).save(&source).unwrap();

        let mut config = AppConfig {
            script_interpreter: "sh".to_string(),
            script_args: Vec::new(),
            output_dir: temp_dir.path().join("out"),
            ..AppConfig::default()
        };
        config.heightmap.size = 16;
        let code = format!("cp '{}' \"$1\"\n", source.display());
        let path = run_heightmap_script(&config, &code).unwrap();

        assert!(path.starts_with(&config.output_dir));
        let saved = image::open(&path).unwrap();
        assert_eq!((saved.width(), saved.height()), (16, 16));
    }

    #[test]
    fn test_tail_keeps_char_boundaries() {
        assert_eq!(tail("abc", 10), "abc");
        assert_eq!(tail("héllo", 4), "llo");
    }
}
