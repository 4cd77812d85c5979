mod command;
mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, io::Write as _};

use anyhow::{Context, Result};
use api_http::{HttpApiOptions, HttpDocumentApi};
use command::{Command, Target};
use config::{ClientConfig, ConfigStore};
use core_session::{
    LoadOutcome, SearchOutcome, SelectionOutcome, SkipReason, SubmitOutcome, Workspace,
    WorkspaceOptions,
};
use core_types::UploadFile;
use i18n::I18n;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct Console {
    workspace: Arc<Workspace>,
    i18n: I18n,
    config: ClientConfig,
    config_store: ConfigStore,
}

impl Console {
    fn say(&self, key: &str, detail: impl std::fmt::Display) {
        println!("{}: {detail}", self.i18n.t(key));
    }

    /// Runs `task` in the background so the prompt stays usable while it waits on
    /// the backend. Output is printed whenever it completes.
    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = String> + Send + 'static,
    {
        tokio::spawn(async move {
            let text = task.await;
            print!("{text}");
            let _ = std::io::stdout().flush();
        });
    }

    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Empty => {}
            Command::Quit => return false,
            Command::Help => print!("{}", render::help(&self.i18n)),
            Command::List => {
                if let LoadOutcome::Failed(err) = self.workspace.refresh_documents().await {
                    self.say("msg.request_failed", err);
                }
                let snapshot = self.workspace.snapshot();
                print!(
                    "{}",
                    render::documents(&self.i18n, &snapshot.documents, &snapshot.query)
                );
            }
            Command::Search(text) => {
                self.workspace.search_input(text.clone());
                self.say("msg.searching", text);
            }
            Command::Select(target) => self.select(target),
            Command::Ask(question) => {
                let workspace = self.workspace.clone();
                let i18n = self.i18n.clone();
                self.spawn(async move {
                    let outcome = workspace.ask(&question).await;
                    describe_submit(&i18n, &workspace, outcome)
                });
            }
            Command::History => {
                let snapshot = self.workspace.snapshot();
                if snapshot.selected.is_none() {
                    println!("{}", self.i18n.t("msg.no_document"));
                } else {
                    print!(
                        "{}",
                        render::transcript(
                            &self.i18n,
                            &snapshot.transcript.messages,
                            snapshot.pending_questions
                        )
                    );
                }
            }
            Command::Models { refresh } => {
                let models = self.workspace.models();
                let outcome = if refresh {
                    models.reload().await
                } else {
                    models.load().await
                };
                if let LoadOutcome::Failed(err) = outcome {
                    self.say("msg.request_failed", err);
                }
                print!(
                    "{}",
                    render::models(&self.i18n, &models.models(), models.selected().as_deref())
                );
            }
            Command::Model(id) => {
                if self.workspace.select_model(&id) {
                    self.say("label.model", id);
                } else {
                    self.say("msg.unknown_model", id);
                }
            }
            Command::Analysis => {
                print!(
                    "{}",
                    render::analysis(&self.i18n, &self.workspace.analysis().state())
                );
            }
            Command::Rag(query) => {
                let workspace = self.workspace.clone();
                let i18n = self.i18n.clone();
                self.spawn(async move {
                    match workspace.rag_search(&query).await {
                        SearchOutcome::Completed => workspace
                            .rag()
                            .result()
                            .map(|result| render::search_result(&i18n, &result))
                            .unwrap_or_default(),
                        SearchOutcome::Busy => format!("{}\n", i18n.t("msg.rag_busy")),
                        SearchOutcome::Blank => String::new(),
                        SearchOutcome::Failed(err) => {
                            format!("{}: {err}\n", i18n.t("msg.request_failed"))
                        }
                    }
                });
            }
            Command::Upload(path) => self.upload(path, true).await,
            Command::Drop(path) => self.upload(path, false).await,
            Command::Status => print!("{}", render::status(&self.i18n, &self.workspace.snapshot())),
            Command::Lang(lang) => {
                self.i18n.set_language(lang);
                self.config.language = lang;
                if let Err(err) = self.config_store.save(&self.config) {
                    error!("failed to save config: {err:#}");
                }
                println!("{}", self.i18n.t("msg.language"));
            }
        }
        true
    }

    fn select(&self, target: Target) {
        let document = match &target {
            Target::Index(index) => index
                .checked_sub(1)
                .and_then(|i| self.workspace.browser().documents().get(i).cloned()),
            Target::Id(id) => self
                .workspace
                .browser()
                .documents()
                .into_iter()
                .find(|doc| doc.id.as_str() == id),
        };
        let Some(document) = document else {
            let shown = match target {
                Target::Index(index) => index.to_string(),
                Target::Id(id) => id,
            };
            self.say("msg.unknown_document", shown);
            return;
        };

        let workspace = self.workspace.clone();
        let i18n = self.i18n.clone();
        self.spawn(async move {
            let name = document.file_name.clone();
            let outcome = workspace.select_document(document).await;
            describe_selection(&i18n, &name, &outcome)
        });
    }

    async fn upload(&self, path: PathBuf, check: bool) {
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                self.say("msg.read_failed", format!("{}: {err}", path.display()));
                return;
            }
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = UploadFile::new(file_name, bytes);

        if check {
            for warning in self.config.upload.check(&file) {
                self.say("msg.upload_warning", warning);
            }
        }

        let workspace = self.workspace.clone();
        let i18n = self.i18n.clone();
        self.spawn(async move {
            match workspace.handle_external_file_drop(file).await {
                Ok(document) => {
                    let snapshot = workspace.snapshot();
                    let index = snapshot
                        .documents
                        .iter()
                        .position(|doc| doc.id == document.id)
                        .map_or(0, |i| i + 1);
                    format!(
                        "{}: {}\n",
                        i18n.t("msg.uploaded"),
                        render::document_line(&i18n, index, &document)
                    )
                }
                Err(err) => format!("{}: {err}\n", i18n.t("msg.upload_failed")),
            }
        });
    }
}

fn describe_selection(i18n: &I18n, name: &str, outcome: &SelectionOutcome) -> String {
    if outcome.content == LoadOutcome::Discarded {
        return format!("{name}: {}\n", i18n.t("msg.discarded"));
    }
    let mut text = format!("{}: {name}\n", i18n.t("label.selected"));
    for (label, load) in [
        ("label.content", &outcome.content),
        ("label.history", &outcome.history),
        ("label.analysis", &outcome.analysis),
    ] {
        if let LoadOutcome::Failed(err) = load {
            text.push_str(&format!(
                "  {}: {} ({err})\n",
                i18n.t(label),
                i18n.t("msg.request_failed")
            ));
        }
    }
    text
}

fn describe_submit(i18n: &I18n, workspace: &Workspace, outcome: SubmitOutcome) -> String {
    match outcome {
        SubmitOutcome::Skipped(SkipReason::NoDocument) => format!("{}\n", i18n.t("msg.no_document")),
        SubmitOutcome::Skipped(SkipReason::BlankQuestion) => {
            format!("{}\n", i18n.t("msg.blank_question"))
        }
        SubmitOutcome::Skipped(SkipReason::NoModel) => format!("{}\n", i18n.t("msg.no_model")),
        SubmitOutcome::Discarded => format!("{}\n", i18n.t("msg.discarded")),
        SubmitOutcome::Answered { .. } | SubmitOutcome::Failed(_) => workspace
            .chat()
            .messages()
            .last()
            .map(|message| format!("{}\n", render::message(i18n, message)))
            .unwrap_or_default(),
    }
}

fn http_options(config: &ClientConfig) -> HttpApiOptions {
    HttpApiOptions {
        base_url: config.backend.base_url.clone(),
        api_prefix: config.backend.api_prefix.clone(),
        timeout: config.backend.request_timeout(),
        extra_headers: config.backend.extra_headers.clone(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    data_dir.push("docintel");
    if let Err(err) = fs::create_dir_all(&data_dir) {
        eprintln!("failed to prepare data dir: {err}");
    }
    let _log_guard = init_local_logger(&data_dir.join("logs"));

    let config_store = ConfigStore::from_default_location()
        .unwrap_or_else(|_| ConfigStore::from_dir(data_dir.join("config")));
    let config = match config_store.load_or_init() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to load config: {err:#}");
            ClientConfig::default()
        }
    };

    let api = HttpDocumentApi::new(http_options(&config))
        .with_context(|| format!("invalid backend url `{}`", config.backend.base_url))?;
    info!(root = %api.root(), "backend configured");

    let workspace = Arc::new(Workspace::new(
        Arc::new(api),
        WorkspaceOptions {
            search_debounce: config.session.search_debounce(),
            model_fallback: config.session.model_fallback,
        },
    ));

    let mut console = Console {
        workspace: workspace.clone(),
        i18n: I18n::new(config.language),
        config,
        config_store,
    };
    println!("{}", console.i18n.t("app.title"));
    println!("{}", console.i18n.t("app.ready"));

    let (models, list) = workspace.start().await;
    for outcome in [models, list] {
        if let LoadOutcome::Failed(err) = outcome {
            console.say("msg.request_failed", err);
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("failed to flush stdout")?;
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        match command::parse(&line) {
            Ok(command) => {
                if !console.handle(command).await {
                    break;
                }
            }
            Err(err) => console.say("msg.unknown_command", err),
        }
    }

    workspace.shutdown();
    println!("{}", console.i18n.t("app.bye"));
    Ok(())
}

fn init_local_logger(log_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("failed to create log dir `{}`: {err}", log_dir.display());
    }
    let file_appender = tracing_appender::rolling::daily(log_dir, "docintel.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,app_cli=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_writer(writer)
        .init();

    guard
}
