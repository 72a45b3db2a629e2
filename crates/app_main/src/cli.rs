//! Command line and the console directory prompt

use anyhow::bail;
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "portfolio", about = "Image portfolio viewer with PDF export")]
pub struct Cli {
    /// Directory of images to present; prompted for when omitted
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Settings file [default: per-user config directory]
    #[arg(short, long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Where the exported PDF is written [default: DIR/portfolio.pdf]
    #[arg(short, long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Export the portfolio and exit without opening a window
    #[arg(long)]
    pub export_only: bool,
}

impl Cli {
    pub fn export_path(&self, dir: &Path) -> PathBuf {
        self.export
            .clone()
            .unwrap_or_else(|| dir.join("portfolio.pdf"))
    }
}

/// Ask for an image directory until an existing one is given
pub fn prompt_for_directory<R: BufRead, W: Write>(mut input: R, mut output: W) -> anyhow::Result<PathBuf> {
    let mut line = String::new();
    loop {
        write!(output, "Image directory: ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            bail!("no image directory given");
        }

        // Paths dropped onto a terminal often arrive quoted.
        let entered = line.trim().trim_matches(|c| c == '"' || c == '\'');
        if entered.is_empty() {
            continue;
        }

        let path = PathBuf::from(entered);
        if path.is_dir() {
            return Ok(path);
        }
        writeln!(output, "Not a directory: {}", entered)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from(["portfolio", "--dir", "photos", "--export-only"]).unwrap();
        assert_eq!(cli.dir, Some(PathBuf::from("photos")));
        assert!(cli.export_only);
        assert_eq!(cli.export_path(Path::new("photos")), Path::new("photos").join("portfolio.pdf"));

        let cli = Cli::try_parse_from(["portfolio", "-e", "out.pdf"]).unwrap();
        assert_eq!(cli.dir, None);
        assert_eq!(cli.export_path(Path::new("photos")), PathBuf::from("out.pdf"));
    }

    #[test]
    fn test_prompt_retries_until_directory() {
        let dir = tempdir().unwrap();
        let script = format!("\n/definitely/not/here\n\"{}\"\n", dir.path().display());
        let mut output = Vec::new();

        let path = prompt_for_directory(Cursor::new(script), &mut output).unwrap();
        assert_eq!(path, dir.path());

        let shown = String::from_utf8(output).unwrap();
        assert_eq!(shown.matches("Image directory: ").count(), 3);
        assert!(shown.contains("Not a directory: /definitely/not/here"));
    }

    #[test]
    fn test_prompt_fails_on_eof() {
        let err = prompt_for_directory(Cursor::new(""), Vec::new()).unwrap_err();
        assert!(err.to_string().contains("no image directory"));
    }
}
