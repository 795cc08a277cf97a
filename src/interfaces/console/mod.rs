mod commands;
mod state;

pub use commands::{Command, HELP};
pub use state::AppState;

use std::io::Write;
use std::path::Path;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::application::use_cases::results_presenter::{
    confirm_export_file_name, default_export_name_today,
};
use crate::application::use_cases::shell::{SelectedImage, ShellState};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::csv::CsvExporter;

/// Line-oriented front end over the application shell.
pub struct Console<R, W> {
    state: AppState,
    input: R,
    output: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(state: AppState, input: R, output: W) -> Self {
        Self {
            state,
            input,
            output,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn into_parts(self) -> (AppState, W) {
        (self.state, self.output)
    }

    /// Reads commands until `quit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        writeln!(self.output, "MeterLens")?;
        writeln!(self.output, "{}", self.state.shell.labels().double_check_notice)?;
        if !self.state.has_api_key {
            writeln!(self.output, "No API key configured. Use `apikey <key>` to store one.")?;
        }
        writeln!(self.output, "Type `help` for commands.")?;

        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;

            let Some(line) = self.read_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            self.state.shell.dismiss_error();
            let outcome = match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(command) => {
                    debug!(?command, "Console command");
                    self.dispatch(command).await
                }
                Err(err) => Err(err),
            };
            if let Err(err) = outcome {
                self.state.shell.set_error(err);
            }
            if let Some(banner) = self.state.shell.banner() {
                writeln!(self.output, "! {}", banner)?;
            }
            if self.state.shell.error().is_some_and(AppError::is_retryable) {
                writeln!(self.output, "  Nothing was saved. Retry with `analyze`.")?;
            }
        }

        info!("Console closed");
        Ok(())
    }

    pub async fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Open(path) => self.open(&path).await,
            Command::Clear => self.state.shell.select_image(None),
            Command::Analyze => self.analyze().await,
            Command::Show => self.show(),
            Command::Sort(key) => {
                self.state.shell.presenter_mut().request_sort(key);
                self.show()
            }
            Command::Collapse => {
                self.state.shell.presenter_mut().toggle_collapsed();
                self.show()
            }
            Command::Export(name) => self.export(name).await,
            Command::Print => self.print(),
            Command::Save(name) => self.save(name).await,
            Command::Sessions => self.list_sessions(),
            Command::Load(id) => {
                self.state.shell.load_session(&self.state.store, &id)?;
                self.show()
            }
            Command::Rename { id, name } => self.rename(&id, name).await,
            Command::Delete(id) => self.delete(&id).await,
            Command::New => self.state.shell.analyze_new(),
            Command::ApiKey(Some(key)) => {
                self.state.store_api_key(&key)?;
                writeln!(self.output, "API key stored.")?;
                Ok(())
            }
            Command::ApiKey(None) => {
                self.state.forget_api_key()?;
                writeln!(self.output, "API key removed.")?;
                Ok(())
            }
            Command::Status => self.status(),
            Command::Help => {
                writeln!(self.output, "{}", HELP)?;
                Ok(())
            }
            Command::Quit => Ok(()),
        }
    }

    async fn open(&mut self, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AppError::ImageReadError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        writeln!(self.output, "Selected {} ({} bytes)", name, bytes.len())?;
        self.state.shell.select_image(Some(SelectedImage::new(name, bytes)))
    }

    async fn analyze(&mut self) -> Result<()> {
        let labels = self.state.shell.labels();
        if self.state.shell.can_analyze() {
            writeln!(self.output, "{}", labels.analysis_in_progress)?;
            self.output.flush()?;
        }

        let analyzer = self.state.analyzer.clone();
        self.state.shell.analyze(analyzer.as_ref()).await?;

        if matches!(self.state.shell.state(), ShellState::ResultsReady { .. }) {
            self.show()?;
        }
        Ok(())
    }

    fn show(&mut self) -> Result<()> {
        let shell = &self.state.shell;
        let labels = shell.labels();
        match shell.current_results(&self.state.store) {
            Some(results) => {
                let rendered = shell.presenter().render_for_screen(results, labels);
                writeln!(self.output, "{}", rendered)?;
            }
            None => writeln!(self.output, "Nothing to show ({}).", shell.state().name())?,
        }
        Ok(())
    }

    fn print(&mut self) -> Result<()> {
        let shell = &self.state.shell;
        let results = shell
            .current_results(&self.state.store)
            .ok_or_else(|| AppError::ValidationError("No results to print".to_string()))?;
        let rendered = shell.presenter().render_for_print(results, shell.labels());
        writeln!(self.output, "{}", rendered)?;
        Ok(())
    }

    async fn export(&mut self, name: Option<String>) -> Result<()> {
        let labels = self.state.shell.labels();
        let bytes = {
            let shell = &self.state.shell;
            let results = shell
                .current_results(&self.state.store)
                .ok_or_else(|| AppError::ValidationError("No results to export".to_string()))?;
            shell.presenter().export_csv(results, labels)?
        };

        let input = match name {
            Some(name) => name,
            None => match self.ask(labels.export_prompt, &default_export_name_today()).await? {
                Some(answer) => answer,
                None => return Ok(()),
            },
        };
        let Some(file_name) = confirm_export_file_name(&input) else {
            writeln!(self.output, "Export cancelled.")?;
            return Ok(());
        };

        let path = CsvExporter::write_file(&self.state.export_dir, &file_name, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Exported results");
        writeln!(self.output, "Saved {}", path.display())?;
        Ok(())
    }

    async fn save(&mut self, name: Option<String>) -> Result<()> {
        let default_name = match self.state.shell.state() {
            ShellState::ResultsReady { image, .. } => image.name.clone(),
            other => {
                return Err(AppError::ValidationError(format!(
                    "Nothing to save while {}",
                    other.name()
                )))
            }
        };
        let labels = self.state.shell.labels();
        let name = match name {
            Some(name) => name,
            None => match self.ask(labels.save_prompt, &default_name).await? {
                Some(answer) => answer,
                None => return Ok(()),
            },
        };

        let thumbnails = self.state.thumbnails;
        let id = self
            .state
            .shell
            .save_results(&mut self.state.store, &name, &thumbnails)?;
        writeln!(self.output, "Saved as {}", id)?;
        Ok(())
    }

    fn list_sessions(&mut self) -> Result<()> {
        let labels = self.state.shell.labels();
        writeln!(self.output, "{}", labels.sessions_title)?;
        if self.state.store.is_empty() {
            writeln!(self.output, "  {}", labels.no_sessions)?;
            return Ok(());
        }

        let active = self.state.shell.active_session_id();
        for session in self.state.store.sessions() {
            let marker = if Some(session.id.as_str()) == active { "*" } else { " " };
            writeln!(
                self.output,
                "{} {}  {}  {}  ({}/{} {})",
                marker,
                session.id,
                session.local_timestamp(),
                session.name,
                session.passed_count(),
                session.results.len(),
                labels.pass
            )?;
        }
        Ok(())
    }

    async fn rename(&mut self, id: &str, name: Option<String>) -> Result<()> {
        let current = self
            .state
            .store
            .find(id)
            .map(|session| session.name.clone())
            .ok_or_else(|| AppError::NotFound(format!("Session {}", id)))?;

        let labels = self.state.shell.labels();
        let name = match name {
            Some(name) => name,
            None => match self.ask(labels.rename_prompt, &current).await? {
                Some(answer) => answer,
                None => return Ok(()),
            },
        };

        self.state
            .shell
            .rename_session(&mut self.state.store, id, &name)?;
        writeln!(self.output, "Renamed {} to {}", id, name.trim())?;
        Ok(())
    }

    async fn delete(&mut self, id: &str) -> Result<()> {
        let name = self
            .state
            .store
            .find(id)
            .map(|session| session.name.clone())
            .ok_or_else(|| AppError::NotFound(format!("Session {}", id)))?;

        let labels = self.state.shell.labels();
        write!(self.output, "{} \"{}\"? [y/N] ", labels.delete_confirm, name)?;
        self.output.flush()?;
        let confirmed = self
            .read_line()
            .await?
            .map(|answer| matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false);
        if !confirmed {
            writeln!(self.output, "Kept {}", name)?;
            return Ok(());
        }

        self.state.shell.delete_session(&mut self.state.store, id)?;
        writeln!(self.output, "Deleted {}", name)?;
        Ok(())
    }

    fn status(&mut self) -> Result<()> {
        let shell = &self.state.shell;
        let detail = match shell.state() {
            ShellState::Idle => String::new(),
            ShellState::ImageSelected { image }
            | ShellState::Analyzing { image }
            | ShellState::ResultsReady { image, .. } => format!(" {}", image.name),
            ShellState::ViewingSavedSession { session_id } => format!(" {}", session_id),
        };
        writeln!(self.output, "State: {}{}", shell.state().name(), detail)?;
        writeln!(
            self.output,
            "API key: {}",
            if self.state.has_api_key { "configured" } else { "missing" }
        )?;
        writeln!(self.output, "Saved analyses: {}", self.state.store.len())?;
        Ok(())
    }

    /// Prompts with a prefilled default. An empty answer keeps the default,
    /// end of input cancels.
    async fn ask(&mut self, label: &str, default: &str) -> Result<Option<String>> {
        write!(self.output, "{} [{}]: ", label, default)?;
        self.output.flush()?;
        Ok(self.read_line().await?.map(|answer| {
            if answer.trim().is_empty() {
                default.to_string()
            } else {
                answer
            }
        }))
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self.input.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Runs the console on process stdin and stdout.
pub async fn run_console(state: AppState) -> Result<()> {
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut console = Console::new(state, input, std::io::stdout());
    console.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::meter_analysis::MeterAnalyzer;
    use crate::application::use_cases::session_store::SessionStore;
    use crate::domain::analysis::{AnalysisResult, CellValue};
    use crate::domain::llm_config::LLMConfig;
    use crate::domain::locale::Locale;
    use crate::domain::prompt::VisionRequest;
    use crate::infrastructure::config::AppSettings;
    use crate::infrastructure::llm_clients::LLMClient;
    use crate::infrastructure::storage::MemoryStorage;
    use async_trait::async_trait;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::Arc;

    struct UnusedClient;

    #[async_trait]
    impl LLMClient for UnusedClient {
        async fn generate(&self, _config: &LLMConfig, _request: &VisionRequest) -> Result<String> {
            Err(AppError::Internal("not used".to_string()))
        }
    }

    struct FixedAnalyzer(Result<Vec<AnalysisResult>>);

    #[async_trait]
    impl MeterAnalyzer for FixedAnalyzer {
        async fn analyze(&self, _image: &[u8]) -> Result<Vec<AnalysisResult>> {
            self.0.clone()
        }
    }

    fn rows() -> Vec<AnalysisResult> {
        vec![
            AnalysisResult {
                condition: "007+008+009 = 006".to_string(),
                calculation: "402+396+559".to_string(),
                actual_result: CellValue::from(1357),
                expected_value: CellValue::from(1357),
                status: true,
                reason: None,
            },
            AnalysisResult {
                condition: "013 = 010".to_string(),
                calculation: "5000-4000".to_string(),
                actual_result: CellValue::from(1000),
                expected_value: CellValue::from(1200),
                status: false,
                reason: None,
            },
        ]
    }

    fn png_file(dir: &Path) -> std::path::PathBuf {
        let mut bytes = Vec::new();
        RgbImage::from_pixel(40, 20, image::Rgb([200, 200, 200]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        let path = dir.join("meter.png");
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn state(dir: &Path, outcome: Result<Vec<AnalysisResult>>) -> AppState {
        let settings = AppSettings {
            locale: Locale::English,
            export_dir: Some(dir.to_path_buf()),
            ..AppSettings::default()
        };
        let store = SessionStore::load_all(Arc::new(MemoryStorage::new()), "sessions");
        AppState::new(
            settings,
            Arc::new(UnusedClient),
            Arc::new(FixedAnalyzer(outcome)),
            true,
            store,
        )
    }

    async fn run_script(state: AppState, script: &str) -> (AppState, String) {
        let mut console = Console::new(state, script.as_bytes(), Vec::new());
        console.run().await.unwrap();
        let (state, output) = console.into_parts();
        (state, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_analyze_export_and_save_flow() {
        let dir = tempfile::tempdir().unwrap();
        let photo = png_file(dir.path());
        let script = format!(
            "open {}\nanalyze\nsort status\nexport readings\nsave Building A\nsessions\nquit\n",
            photo.display()
        );

        let (state, output) = run_script(state(dir.path(), Ok(rows())), &script).await;

        assert!(output.contains("Selected meter.png"));
        assert!(output.contains("Verification Results"));
        assert!(output.contains("Saved as "));
        assert!(output.contains("Building A"));
        assert!(!output.contains("! "));

        let csv = std::fs::read(dir.path().join("readings.csv")).unwrap();
        let text = String::from_utf8(csv).unwrap();
        let fail_at = text.find("\"Fail\"").unwrap();
        let pass_at = text.find("\"Pass\"").unwrap();
        assert!(fail_at < pass_at, "status ascending puts failures first");

        assert_eq!(state.store.len(), 1);
        assert!(state.store.sessions()[0].image_data_url.is_some());
        assert!(matches!(
            state.shell.state(),
            ShellState::ViewingSavedSession { .. }
        ));
    }

    #[tokio::test]
    async fn test_analyze_without_image_shows_banner() {
        let dir = tempfile::tempdir().unwrap();
        let (state, output) = run_script(state(dir.path(), Ok(rows())), "analyze\n").await;

        assert!(output.contains("! Please select an image before analyzing"));
        assert!(!output.contains("Retry with"));
        assert_eq!(state.shell.state(), &ShellState::Idle);
    }

    #[tokio::test]
    async fn test_failed_analysis_keeps_image_and_wraps_message() {
        let dir = tempfile::tempdir().unwrap();
        let photo = png_file(dir.path());
        let failure = Err(AppError::TransportError("HTTP 503".to_string()));
        let script = format!("open {}\nanalyze\n", photo.display());

        let (state, output) = run_script(state(dir.path(), failure), &script).await;

        assert!(output.contains("! Image analysis failed: HTTP 503"));
        assert!(output.contains("Retry with `analyze`"));
        assert!(matches!(
            state.shell.state(),
            ShellState::ImageSelected { .. }
        ));
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let photo = png_file(dir.path());
        let setup = format!("open {}\nanalyze\nsave first\n", photo.display());
        let (state, _) = run_script(state(dir.path(), Ok(rows())), &setup).await;
        let id = state.store.sessions()[0].id.clone();

        let (state, output) = run_script(state, &format!("delete {}\nn\n", id)).await;
        assert!(output.contains("Are you sure you want to delete \"first\"?"));
        assert!(output.contains("Kept first"));
        assert_eq!(state.store.len(), 1);

        let (state, output) = run_script(state, &format!("delete {}\ny\n", id)).await;
        assert!(output.contains("Deleted first"));
        assert!(state.store.is_empty());
        assert_eq!(state.shell.state(), &ShellState::Idle);
    }

    #[tokio::test]
    async fn test_rename_prompt_keeps_current_name_on_empty_answer() {
        let dir = tempfile::tempdir().unwrap();
        let photo = png_file(dir.path());
        let setup = format!("open {}\nanalyze\nsave original\n", photo.display());
        let (state, _) = run_script(state(dir.path(), Ok(rows())), &setup).await;
        let id = state.store.sessions()[0].id.clone();

        let (state, output) = run_script(state, &format!("rename {}\n\n", id)).await;
        assert!(output.contains("Rename [original]: "));
        assert_eq!(state.store.sessions()[0].name, "original");

        let (state, _) = run_script(state, &format!("rename {}   renamed  \n", id)).await;
        assert_eq!(state.store.sessions()[0].name, "renamed");
    }

    #[tokio::test]
    async fn test_unknown_session_and_command_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (_, output) =
            run_script(state(dir.path(), Ok(rows())), "load 123\nfrobnicate\nexport\n").await;

        assert!(output.contains("Session 123"));
        assert!(output.contains("Unknown command: frobnicate"));
        assert!(output.contains("No results to export"));
    }

    #[tokio::test]
    async fn test_failed_export_reports_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let photo = png_file(dir.path());
        let mut app = state(dir.path(), Ok(rows()));
        app.export_dir = dir.path().join("missing").join("exports");
        let script = format!("open {}\nanalyze\nexport readings\n", photo.display());

        let (_, output) = run_script(app, &script).await;

        assert!(output.contains("! Saving data failed: Failed to write"));
        assert!(!output.contains("Image analysis failed"));
        assert!(!output.contains("Retry with"));
    }

    #[tokio::test]
    async fn test_print_omits_interactive_hints() {
        let dir = tempfile::tempdir().unwrap();
        let photo = png_file(dir.path());
        let script = format!("open {}\nanalyze\nprint\n", photo.display());
        let (_, output) = run_script(state(dir.path(), Ok(rows())), &script).await;

        let printed = output.rsplit("> ").nth(1).unwrap();
        assert!(printed.contains("402+396+559"));
        assert!(!printed.contains("[save]"));
    }
}
