use std::path::PathBuf;
use std::time::Duration;

use eframe::egui;

use crate::config::{Config, EngineKind};
use crate::engines;
use crate::reader::{Command, Reader, ReaderError, ReaderState};

const LICENSE_TEXT: &str = "\
TTS Free - Licensing & Attribution

App:
  • TTS Free (MIT)

Speech Engines:
  • Kokoro-82M - Apache 2.0 (model weights and voices)
  • Piper - MIT (binary and voice packs in rhasspy/piper-voices)
  • eSpeak NG - GPLv3 (optional, off by default)
";

/// While audio is playing or synthesizing, repaint this often so the reader is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ReaderApp {
    reader: Reader,
    /// Settings used to open another engine from the toolbar.
    config: Config,
    /// Pending error dialogs, oldest first.
    errors: Vec<String>,
    show_about: bool,
}

impl ReaderApp {
    pub fn new(
        reader: Reader,
        config: Config,
        initial_file: Option<PathBuf>,
        notices: Vec<String>,
    ) -> Self {
        let mut app = Self {
            reader,
            config,
            errors: notices,
            show_about: false,
        };
        if let Some(path) = initial_file {
            app.run(Command::LoadFile(path));
        }
        app
    }

    fn run(&mut self, command: Command) {
        if let Err(e) = self.reader.dispatch(command) {
            self.report(e);
        }
    }

    fn report(&mut self, e: ReaderError) {
        log::error!("{e}");
        self.errors.push(e.to_string());
    }

    fn switch_engine(&mut self, kind: EngineKind) {
        let switched = engines::open(kind, &self.config)
            .map_err(ReaderError::from)
            .and_then(|engine| self.reader.replace_engine(engine));
        if let Err(e) = switched {
            self.report(e);
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        let busy = self.reader.is_busy();
        let loaded = matches!(self.reader.state(), ReaderState::FileLoaded { .. });

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!busy, egui::Button::new("Load .txt/.docx"))
                .clicked()
            {
                let picked = rfd::FileDialog::new()
                    .set_title("Open Document")
                    .add_filter("Documents", &["txt", "docx"])
                    .pick_file();
                if let Some(path) = picked {
                    self.run(Command::LoadFile(path));
                }
            }

            if ui.button("Pronunciation CSV").clicked() {
                let picked = rfd::FileDialog::new()
                    .set_title("Pronunciation CSV")
                    .add_filter("CSV", &["csv"])
                    .pick_file();
                if let Some(path) = picked {
                    self.run(Command::LoadPronunciation(path));
                }
            }

            ui.separator();

            let mut picked_engine = None;
            egui::ComboBox::from_label("Engine")
                .selected_text(self.reader.engine_name())
                .show_ui(ui, |ui| {
                    for kind in EngineKind::selectable(self.config.allow_espeak) {
                        if ui.selectable_label(false, kind.label()).clicked() {
                            picked_engine = Some(kind);
                        }
                    }
                });
            if let Some(kind) = picked_engine {
                if busy {
                    self.report(ReaderError::Busy);
                } else {
                    self.switch_engine(kind);
                }
            }
            ui.checkbox(&mut self.config.allow_espeak, "Allow eSpeak fallback");

            let mut speaker = self.reader.speaker().to_string();
            egui::ComboBox::from_label("Voice")
                .selected_text(speaker.as_str())
                .show_ui(ui, |ui| {
                    for voice in self.reader.speakers() {
                        ui.selectable_value(&mut speaker, voice.clone(), voice.as_str());
                    }
                });
            if speaker != self.reader.speaker() {
                self.run(Command::SetSpeaker(speaker));
            }

            let mut auto_play = self.reader.auto_play();
            if ui.checkbox(&mut auto_play, "Auto-play on Next").changed() {
                self.run(Command::SetAutoPlay(auto_play));
            }
            let mut auto_advance = self.reader.auto_advance();
            if ui.checkbox(&mut auto_advance, "Auto-advance").changed() {
                self.run(Command::SetAutoAdvance(auto_advance));
            }
        });

        ui.horizontal(|ui| {
            let ready = loaded && !busy;
            let at_end = self.reader.cursor().map_or(true, |c| c.is_at_end());
            if ui
                .add_enabled(ready, egui::Button::new("▶ Play Current"))
                .clicked()
            {
                self.run(Command::PlayCurrent);
            }
            if ui
                .add_enabled(ready && !at_end, egui::Button::new("⏭ Next"))
                .clicked()
            {
                self.run(Command::Next);
            }
            if ui
                .add_enabled(
                    self.reader.is_playing() || busy,
                    egui::Button::new("■ Stop"),
                )
                .clicked()
            {
                self.run(Command::Stop);
            }
        });
    }

    fn status(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if self.reader.is_busy() {
                ui.spinner();
                ui.label("Synthesizing…");
            } else if self.reader.is_playing() {
                ui.label("Playing");
            } else {
                ui.label("Ready");
            }
            ui.separator();
            ui.label(format!("Backend: {}", self.reader.backend_label()));
            if let Some(cursor) = self.reader.cursor() {
                ui.separator();
                if let Some(name) = cursor.document().source().and_then(|p| p.file_name()) {
                    ui.label(name.to_string_lossy().into_owned());
                }
                let total = cursor.document().len();
                let line = if total == 0 { 0 } else { cursor.index() + 1 };
                ui.label(format!("Line {line}/{total}"));
            }
            let rules = self.reader.pronunciation_rules();
            if rules > 0 {
                ui.separator();
                ui.label(format!("{rules} pronunciation rules"));
            }
        });
    }

    fn error_dialog(&mut self, ctx: &egui::Context) {
        let Some(message) = self.errors.first().cloned() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message.as_str());
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.errors.remove(0);
        }
    }
}

impl eframe::App for ReaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Err(e) = self.reader.poll() {
            self.report(e);
        }

        let can_step = self.errors.is_empty()
            && !self.reader.is_busy()
            && self.reader.cursor().is_some_and(|c| !c.is_at_end());
        if can_step && ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            self.run(Command::Next);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("Help", |ui| {
                    if ui.button("About").clicked() {
                        self.show_about = true;
                        ui.close_menu();
                    }
                });
            });
            self.toolbar(ui);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| self.status(ui));

        let current = self.reader.current_text();
        let next = self.reader.next_text();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.strong("Current:");
            ui.add(
                egui::TextEdit::multiline(&mut current.as_str())
                    .desired_width(f32::INFINITY)
                    .desired_rows(6),
            );
            ui.add_space(8.0);
            ui.strong("Next:");
            ui.add(
                egui::TextEdit::multiline(&mut next.as_str())
                    .desired_width(f32::INFINITY)
                    .desired_rows(6),
            );
        });

        egui::Window::new("About / Licenses")
            .open(&mut self.show_about)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.label(LICENSE_TEXT);
            });

        self.error_dialog(ctx);

        if self.reader.is_busy() || self.reader.is_playing() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }
}

/// Open the main window and run until it is closed.
///
/// `notices` are startup problems shown as error dialogs once the window is up.
pub fn run(
    reader: Reader,
    config: Config,
    initial_file: Option<PathBuf>,
    notices: Vec<String>,
) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("TTS Free")
            .with_inner_size([980.0, 640.0]),
        ..Default::default()
    };
    let app = ReaderApp::new(reader, config, initial_file, notices);
    eframe::run_native("TTS Free", options, Box::new(move |_cc| Ok(Box::new(app))))
}
