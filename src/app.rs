use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arboard::Clipboard;
use chrono::Utc;
use eframe::App;
use egui::{self, Align, Color32, Context, Frame, Layout, RichText, ScrollArea, Ui, Vec2};
use poll_promise::Promise;

use crate::audio::AudioPlayer;
use crate::auth::{AuthClient, AuthEvent, AuthGate, AuthStatus, Countdown, GateState};
use crate::catalog::{CatalogClient, ClipFetcher};
use crate::constants::STATUS_POLL_INTERVAL;
use crate::download::{download_one, DownloadController, DownloadEvent, SavedFile};
use crate::error::AppError;
use crate::i18n::{Lang, Localizer, Strings};
use crate::model::{Category, Character, ClipRef, VoiceType};
use crate::naming::archive_name;
use crate::playback::{EndReason, PlaybackEvent, PlaybackOrchestrator};
use crate::selection::SelectionState;
use crate::settings::{save_settings, Settings};
use crate::task::BackgroundTask;

pub struct Services {
    pub catalog: CatalogClient,
    pub auth: AuthClient,
}

#[derive(Default)]
struct Taxonomy {
    characters: Vec<Character>,
    categories: Vec<Category>,
    types: Vec<VoiceType>,
}

impl Taxonomy {
    /// Nothing to pick from: the catalog location is wrong or unreachable.
    fn is_unusable(&self) -> bool {
        self.characters.is_empty() || self.categories.is_empty()
    }
}

struct ManifestLoad {
    character_id: String,
    category: String,
    clips: Vec<ClipRef>,
}

enum StatusView {
    Unknown,
    Ready(AuthStatus),
    Error,
}

pub struct VoiceBrowserApp {
    settings: Settings,
    localizer: Localizer,
    catalog: CatalogClient,
    auth: AuthClient,

    gate: AuthGate,
    password_input: String,
    status_promise: Option<Promise<Result<AuthStatus, AppError>>>,
    status_view: StatusView,
    last_status_check: Option<Instant>,

    taxonomy: Taxonomy,
    taxonomy_task: Option<BackgroundTask<Taxonomy>>,
    selection: SelectionState,
    clips: Vec<ClipRef>,
    manifest_task: Option<BackgroundTask<ManifestLoad>>,
    selectors_visible: bool,

    player: Option<PlaybackOrchestrator<AudioPlayer>>,
    player_error: Option<String>,
    scroll_to: Option<ClipRef>,

    downloads: DownloadController,
    single_download: Option<BackgroundTask<SavedFile>>,

    status_text: Option<String>,
    error_text: Option<String>,
    copy_feedback_until: Option<Instant>,
}

impl VoiceBrowserApp {
    pub fn new(
        settings: Settings,
        services: Services,
        deep_link: Option<&str>,
        remembered_password: Option<String>,
    ) -> Self {
        let localizer = Localizer::load(settings.preferred_language.as_deref());
        let (player, player_error) = match AudioPlayer::new() {
            Ok(player) => (Some(PlaybackOrchestrator::new(player)), None),
            Err(err) => {
                log::warn!("Audio output unavailable: {err}");
                (None, Some(err.to_string()))
            }
        };
        let gate = AuthGate::new(Arc::new(services.auth.clone()), remembered_password);
        let selection = deep_link.map(SelectionState::from_query).unwrap_or_default();

        let mut app = Self {
            settings,
            localizer,
            catalog: services.catalog,
            auth: services.auth,
            gate,
            password_input: String::new(),
            status_promise: None,
            status_view: StatusView::Unknown,
            last_status_check: None,
            taxonomy: Taxonomy::default(),
            taxonomy_task: None,
            selection,
            clips: Vec::new(),
            manifest_task: None,
            selectors_visible: true,
            player,
            player_error,
            scroll_to: None,
            downloads: DownloadController::default(),
            single_download: None,
            status_text: None,
            error_text: None,
            copy_feedback_until: None,
        };
        app.load_taxonomy();
        app.refresh_status();
        app.gate.resume();
        if app.selection.is_complete() {
            app.load_manifest();
        }
        app
    }

    fn strings(&self) -> Arc<Strings> {
        self.localizer.shared()
    }

    fn lang(&self) -> Lang {
        self.localizer.current()
    }

    fn load_taxonomy(&mut self) {
        let catalog = self.catalog.clone();
        self.taxonomy_task = Some(BackgroundTask::spawn(move || {
            // Each list degrades on its own; an empty selector beats no UI.
            let characters = catalog.characters().unwrap_or_else(|err| {
                log::error!("Failed to load characters: {err}");
                Vec::new()
            });
            let categories = catalog.categories().unwrap_or_else(|err| {
                log::error!("Failed to load categories: {err}");
                Vec::new()
            });
            let types = catalog.types().unwrap_or_else(|err| {
                log::error!("Failed to load types: {err}");
                Vec::new()
            });
            Ok(Taxonomy {
                characters,
                categories,
                types,
            })
        }));
    }

    fn poll_taxonomy(&mut self, ctx: &Context) {
        if let Some(task) = &mut self.taxonomy_task {
            if let Some(result) = task.try_take() {
                self.taxonomy_task = None;
                match result {
                    Ok(taxonomy) => {
                        log::info!(
                            "Loaded {} characters, {} categories, {} types",
                            taxonomy.characters.len(),
                            taxonomy.categories.len(),
                            taxonomy.types.len()
                        );
                        self.taxonomy = taxonomy;
                    }
                    Err(err) => log::error!("Failed to load selectors: {err}"),
                }
            } else {
                ctx.request_repaint();
            }
        }
    }

    fn load_manifest(&mut self) {
        let (Some(character_id), Some(category)) = (
            self.selection.character_id().map(str::to_string),
            self.selection.category().map(str::to_string),
        ) else {
            return;
        };
        let catalog = self.catalog.clone();
        self.manifest_task = Some(BackgroundTask::spawn(move || {
            let manifest = catalog.manifest(&character_id)?;
            let clips = manifest.clips_in(&category);
            Ok(ManifestLoad {
                character_id,
                category,
                clips,
            })
        }));
    }

    fn poll_manifest(&mut self, ctx: &Context) {
        if let Some(task) = &mut self.manifest_task {
            if let Some(result) = task.try_take() {
                self.manifest_task = None;
                match result {
                    Ok(load) => {
                        let current = self.selection.character_id()
                            == Some(load.character_id.as_str())
                            && self.selection.category() == Some(load.category.as_str());
                        if current {
                            log::info!(
                                "{} clips for {}/{}",
                                load.clips.len(),
                                load.character_id,
                                load.category
                            );
                            self.clips = load.clips;
                        } else {
                            log::debug!("Dropping manifest for a stale selection");
                        }
                    }
                    Err(err) => log::error!("Failed to load voice list: {err}"),
                }
            } else {
                ctx.request_repaint();
            }
        }
    }

    fn refresh_status(&mut self) {
        let client = self.auth.clone();
        self.last_status_check = Some(Instant::now());
        self.status_promise = Some(Promise::spawn_thread("auth-status", move || {
            client.status()
        }));
    }

    fn poll_status(&mut self, ctx: &Context) {
        if let Some(promise) = self.status_promise.take() {
            match promise.try_take() {
                Ok(Ok(status)) => self.status_view = StatusView::Ready(status),
                Ok(Err(err)) => {
                    log::error!("Status check error: {err}");
                    self.status_view = StatusView::Error;
                }
                Err(promise) => {
                    self.status_promise = Some(promise);
                    ctx.request_repaint_after(Duration::from_millis(200));
                }
            }
        } else if self
            .last_status_check
            .map_or(true, |at| at.elapsed() >= STATUS_POLL_INTERVAL)
        {
            self.refresh_status();
        }
    }

    fn poll_auth(&mut self, ctx: &Context) {
        match self.gate.poll() {
            Some(AuthEvent::Unlocked) => {
                self.password_input.clear();
            }
            Some(AuthEvent::Rejected) => {
                log::warn!("Authentication failed; resetting view");
                self.reset_view();
            }
            None => {
                if self.gate.state() == GateState::Verifying {
                    ctx.request_repaint();
                }
            }
        }
    }

    /// Back to a freshly started, locked view.
    fn reset_view(&mut self) {
        if let Some(player) = &mut self.player {
            player.stop();
            player.poll();
        }
        self.downloads.decline();
        self.downloads.cancel();
        self.password_input.clear();
        self.selection = SelectionState::default();
        self.clips.clear();
        self.manifest_task = None;
        self.scroll_to = None;
    }

    fn fetcher(&self) -> Option<Arc<dyn ClipFetcher>> {
        let character_id = self.selection.character_id()?;
        let media: Arc<dyn ClipFetcher> = Arc::new(self.catalog.media_for(character_id));
        Some(media)
    }

    fn visible_clips(&self) -> Vec<ClipRef> {
        self.selection.visible_clips(&self.clips)
    }

    fn on_character_change(&mut self, character_id: Option<String>) {
        self.stop_playback();
        self.selection.select_character(character_id.as_deref());
        self.clips.clear();
        self.manifest_task = None;
    }

    fn on_category_change(&mut self, category: Option<String>) {
        self.stop_playback();
        if self.selection.select_category(category.as_deref()) {
            self.clips.clear();
            self.manifest_task = None;
            self.load_manifest();
        }
    }

    fn on_type_toggle(&mut self, type_id: &str, checked: bool) {
        self.selection.set_type(type_id, checked);
    }

    fn stop_playback(&mut self) {
        if let Some(player) = &mut self.player {
            player.stop();
        }
    }

    fn play_single(&mut self, clip: ClipRef) {
        let Some(fetcher) = self.fetcher() else {
            return;
        };
        let Some(player) = self.player.as_mut() else {
            self.error_text = Some(self.strings().messages.audio_unavailable.clone());
            return;
        };
        player.play_single(fetcher, clip);
    }

    fn toggle_play_all(&mut self) {
        let Some(fetcher) = self.fetcher() else {
            return;
        };
        let clips = self.visible_clips();
        let Some(player) = self.player.as_mut() else {
            self.error_text = Some(self.strings().messages.audio_unavailable.clone());
            return;
        };
        player.play_all(fetcher, clips);
    }

    fn poll_playback(&mut self, ctx: &Context) {
        let Some(player) = &mut self.player else {
            return;
        };
        for event in player.poll() {
            match event {
                PlaybackEvent::ClipStarted { clip, .. } => self.scroll_to = Some(clip),
                PlaybackEvent::ClipFinished { .. } => {}
                PlaybackEvent::SessionEnded { reason, .. } => {
                    self.scroll_to = None;
                    if let EndReason::Failed(err) = reason {
                        log::warn!("Playback stopped: {err}");
                    }
                }
            }
        }
        if !player.is_idle() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn request_download_all(&mut self) {
        let (Some(character_id), Some(category)) =
            (self.selection.character_id(), self.selection.category())
        else {
            return;
        };
        let name = archive_name(character_id, category, self.selection.types());
        let items = self.visible_clips();
        if items.is_empty() {
            return;
        }
        let Some(fetcher) = self.fetcher() else {
            return;
        };
        self.downloads.request_all(fetcher, items, name);
    }

    fn poll_downloads(&mut self, ctx: &Context) {
        match self.downloads.poll() {
            Some(DownloadEvent::ArchiveReady {
                file,
                entries,
                failed,
            }) => {
                if !failed.is_empty() {
                    log::warn!("{} clips missing from {}", failed.len(), file.file_name);
                }
                log::info!("Saving {} with {entries} clips", file.file_name);
                self.save_file(file);
            }
            Some(DownloadEvent::Cancelled) => {
                self.status_text = None;
            }
            Some(DownloadEvent::Failed(err)) => {
                self.error_text = Some(err.to_string());
            }
            None => {
                if self.downloads.is_busy() {
                    ctx.request_repaint_after(Duration::from_millis(100));
                }
            }
        }
    }

    fn download_single(&mut self, clip: ClipRef) {
        if self.single_download.is_some() {
            return;
        }
        let Some(fetcher) = self.fetcher() else {
            return;
        };
        self.single_download = Some(BackgroundTask::spawn(move || {
            download_one(fetcher.as_ref(), &clip)
        }));
    }

    fn poll_single_download(&mut self, ctx: &Context) {
        if let Some(task) = &mut self.single_download {
            if let Some(result) = task.try_take() {
                self.single_download = None;
                match result {
                    Ok(file) => self.save_file(file),
                    Err(err) => log::error!("Download failed: {err}"),
                }
            } else {
                ctx.request_repaint();
            }
        }
    }

    fn save_file(&mut self, file: SavedFile) {
        if let Some(path) = rfd::FileDialog::new()
            .set_title(self.strings().controls.save.as_str())
            .set_file_name(file.file_name.as_str())
            .save_file()
        {
            if let Err(err) = fs::write(&path, &file.bytes) {
                self.error_text = Some(format!("Failed to save file: {err}"));
            } else {
                self.status_text = Some(format!("Saved {}", path.display()));
                self.error_text = None;
            }
        }
    }

    fn switch_language(&mut self, lang: Lang) {
        if !self.localizer.switch(lang) {
            return;
        }
        self.settings.preferred_language = Some(lang.code().to_string());
        if let Err(err) = save_settings(&self.settings) {
            log::warn!("Could not persist language preference: {err:#}");
        }
        self.refresh_status();
    }

    fn copy_link(&mut self) {
        let link = self.selection.to_query();
        if link.is_empty() {
            return;
        }
        match Clipboard::new() {
            Ok(mut clipboard) => {
                if clipboard.set_text(link).is_ok() {
                    self.copy_feedback_until = Some(Instant::now() + Duration::from_secs(2));
                }
            }
            Err(err) => {
                self.error_text = Some(format!("Clipboard error: {err}"));
            }
        }
    }

    fn show_top_bar(&mut self, ui: &mut Ui, strings: &Strings) {
        ui.horizontal(|ui| {
            ui.label(RichText::new(&strings.title).heading());
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                for lang in [Lang::En, Lang::Ja] {
                    if ui
                        .selectable_label(self.lang() == lang, lang.display_name())
                        .clicked()
                    {
                        self.switch_language(lang);
                    }
                }
            });
        });
        ui.horizontal(|ui| match &self.status_view {
            StatusView::Unknown => {}
            StatusView::Ready(status) => match Countdown::until(status.next_change, Utc::now()) {
                Countdown::Updating => {
                    ui.label(&strings.status.updating);
                }
                countdown => {
                    ui.label(&strings.status.until);
                    if let Some(label) = countdown.label() {
                        ui.label(RichText::new(label).monospace().strong());
                    }
                }
            },
            StatusView::Error => {
                ui.colored_label(Color32::from_rgb(200, 60, 60), &strings.status.error);
            }
        });
    }

    fn show_warning(ui: &mut Ui, strings: &Strings) {
        if strings.warning.is_empty() {
            return;
        }
        Frame::group(ui.style())
            .fill(Color32::from_rgb(255, 236, 236))
            .show(ui, |ui| {
                ui.colored_label(
                    Color32::from_rgb(200, 40, 40),
                    format!("⚠ {}", strings.warning),
                );
            });
    }

    fn show_auth(&mut self, ui: &mut Ui, strings: &Strings) {
        ui.add_space(24.0);
        Self::show_warning(ui, strings);
        ui.add_space(12.0);
        ui.vertical_centered(|ui| {
            ui.heading(&strings.auth.title);
            ui.add_space(8.0);
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.password_input)
                    .password(true)
                    .hint_text(strings.auth.placeholder.as_str()),
            );
            let entered = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            ui.add_space(6.0);
            let verifying = self.gate.state() == GateState::Verifying;
            let clicked = ui
                .add_enabled(!verifying, egui::Button::new(&strings.auth.submit))
                .clicked();
            if (clicked || entered) && !verifying {
                let password = self.password_input.clone();
                self.gate.submit(&password);
            }
            if verifying {
                ui.spinner();
            }
            if self.gate.error_visible() {
                ui.colored_label(Color32::from_rgb(200, 60, 60), &strings.auth.error);
            }
        });
    }

    fn show_selectors(&mut self, ui: &mut Ui, strings: &Strings) {
        let toggle_label = if self.selectors_visible {
            &strings.selectors.toggle_hide
        } else {
            &strings.selectors.toggle_show
        };
        if ui.button(toggle_label).clicked() {
            self.selectors_visible = !self.selectors_visible;
        }
        if !self.selectors_visible {
            return;
        }

        if self.taxonomy_task.is_none() && self.taxonomy.is_unusable() {
            ui.colored_label(
                Color32::from_rgb(200, 60, 60),
                &strings.messages.catalog_empty,
            );
            ui.label(RichText::new(&self.settings.catalog_base).monospace().weak());
        }

        let lang = self.lang();
        let labels = lang.selector_labels();

        ui.label(labels.character);
        let mut chosen = self.selection.character_id().map(str::to_string);
        let before = chosen.clone();
        let selected_text = chosen
            .as_deref()
            .and_then(|id| self.taxonomy.characters.iter().find(|c| c.id == id))
            .map(|c| lang.pick(&c.name, &c.name_en).to_string())
            .unwrap_or_else(|| strings.selectors.character.clone());
        egui::ComboBox::from_id_source("character_select")
            .selected_text(selected_text)
            .width(ui.available_width())
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut chosen, None, &strings.selectors.character);
                for character in &self.taxonomy.characters {
                    ui.selectable_value(
                        &mut chosen,
                        Some(character.id.clone()),
                        lang.pick(&character.name, &character.name_en),
                    );
                }
            });
        if chosen != before {
            self.on_character_change(chosen);
        }

        if self.selection.shows_category_selector() {
            ui.add_space(6.0);
            ui.label(labels.category);
            let mut chosen = self.selection.category().map(str::to_string);
            let before = chosen.clone();
            let selected_text = chosen
                .as_deref()
                .and_then(|id| self.taxonomy.categories.iter().find(|c| c.name_en == id))
                .map(|c| lang.pick(&c.name, &c.name_en).to_string())
                .unwrap_or_else(|| strings.selectors.category.clone());
            egui::ComboBox::from_id_source("category_select")
                .selected_text(selected_text)
                .width(ui.available_width())
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut chosen, None, &strings.selectors.category);
                    for category in &self.taxonomy.categories {
                        ui.selectable_value(
                            &mut chosen,
                            Some(category.name_en.clone()),
                            lang.pick(&category.name, &category.name_en),
                        );
                    }
                });
            if chosen != before {
                self.on_category_change(chosen);
            }
        }

        if self.selection.shows_type_selector() {
            let options: Vec<(String, String)> = self
                .selection
                .type_options(&self.taxonomy.types)
                .into_iter()
                .map(|t| (t.name_en.clone(), lang.pick(&t.name, &t.name_en).to_string()))
                .collect();
            if !options.is_empty() {
                ui.add_space(6.0);
                ui.label(labels.kind);
                ui.horizontal_wrapped(|ui| {
                    for (id, label) in options {
                        let mut checked = self.selection.is_type_selected(&id);
                        if ui.checkbox(&mut checked, label).changed() {
                            self.on_type_toggle(&id, checked);
                        }
                    }
                });
            }
        }
    }

    fn show_bulk_controls(&mut self, ui: &mut Ui, strings: &Strings) {
        let playing_all = self
            .player
            .as_ref()
            .map(|p| p.is_playing_all())
            .unwrap_or(false);
        ui.horizontal(|ui| {
            let play_label = if playing_all {
                format!("■ {}", strings.controls.stop)
            } else {
                format!("▶ {}", strings.controls.play_all)
            };
            if ui.button(play_label).clicked() {
                self.toggle_play_all();
            }
            if playing_all {
                if let Some(index) = self.player.as_ref().and_then(|p| p.current_index()) {
                    ui.label(format!("{}/{}", index + 1, self.visible_clips().len()));
                }
            }
            let can_download = !self.downloads.is_busy();
            if ui
                .add_enabled(
                    can_download,
                    egui::Button::new(format!("⬇ {}", strings.controls.download_all)),
                )
                .clicked()
            {
                self.request_download_all();
            }
            if ui
                .button("🔗")
                .on_hover_text(&strings.controls.copy_link)
                .clicked()
            {
                self.copy_link();
            }
            if let Some(deadline) = self.copy_feedback_until {
                if Instant::now() < deadline {
                    ui.label(
                        RichText::new(&strings.controls.copied).color(Color32::from_rgb(0, 150, 0)),
                    );
                } else {
                    self.copy_feedback_until = None;
                }
            }
        });
    }

    fn show_clip_list(&mut self, ui: &mut Ui) {
        let visible = self.visible_clips();
        let current = self
            .player
            .as_ref()
            .and_then(|p| p.current_clip().cloned());
        let clip_status = self.player.as_ref().map(|p| {
            if p.is_loading() {
                None
            } else {
                Some(time_label(p.output()))
            }
        });
        let scroll_target = self.scroll_to.take();
        let mut play_request = None;
        let mut download_request = None;

        ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            for clip in &visible {
                let playing = current.as_ref() == Some(clip);
                let fill = if playing {
                    Color32::from_rgb(220, 235, 255)
                } else {
                    Color32::TRANSPARENT
                };
                let response = Frame::group(ui.style())
                    .fill(fill)
                    .show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        ui.horizontal(|ui| {
                            ui.label(&clip.title);
                            if playing {
                                match &clip_status {
                                    Some(Some(label)) => {
                                        ui.label(RichText::new(label).monospace().weak());
                                    }
                                    Some(None) => {
                                        ui.spinner();
                                    }
                                    None => {}
                                }
                            }
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                if ui.button("⬇").clicked() {
                                    download_request = Some(clip.clone());
                                }
                                let icon = if playing { "■" } else { "▶" };
                                if ui.button(icon).clicked() {
                                    play_request = Some(clip.clone());
                                }
                            });
                        });
                    })
                    .response;
                if scroll_target.as_ref() == Some(clip) {
                    response.scroll_to_me(Some(Align::Center));
                }
            }
        });

        if let Some(clip) = play_request {
            self.play_single(clip);
        }
        if let Some(clip) = download_request {
            self.download_single(clip);
        }
    }

    fn show_main(&mut self, ui: &mut Ui, strings: &Strings) {
        Self::show_warning(ui, strings);
        ui.add_space(8.0);
        self.show_selectors(ui, strings);
        ui.add_space(10.0);
        ui.separator();

        if self.selection.needs_required_message() {
            ui.add_space(16.0);
            ui.vertical_centered(|ui| {
                ui.label(RichText::new(&strings.messages.required_selection).italics());
            });
            return;
        }
        if self.manifest_task.is_some() {
            ui.spinner();
            return;
        }
        self.show_bulk_controls(ui, strings);
        ui.add_space(6.0);
        self.show_clip_list(ui);
    }

    fn show_confirmation(&mut self, ctx: &Context, strings: &Strings) {
        if !self.downloads.awaiting_confirmation() {
            return;
        }
        let mut confirmed = false;
        let mut declined = false;
        egui::Window::new(&strings.controls.download_all)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(&strings.controls.download_confirm);
                ui.add_space(8.0);
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.button(&strings.controls.ok).clicked() {
                        confirmed = true;
                    }
                    if ui.button(&strings.controls.cancel).clicked() {
                        declined = true;
                    }
                });
            });
        if confirmed {
            self.downloads.confirm();
        } else if declined {
            self.downloads.decline();
        }
    }

    fn show_progress(&mut self, ctx: &Context, strings: &Strings) {
        let Some(job) = self.downloads.job() else {
            return;
        };
        let progress = job.progress();
        let title = job.archive_name().to_string();
        let mut cancel = false;
        egui::Window::new(&strings.controls.downloading)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(RichText::new(title).monospace());
                ui.add(
                    egui::ProgressBar::new(progress.fraction())
                        .desired_width(280.0)
                        .text(format!(
                            "{}/{} ({}%)",
                            progress.completed,
                            progress.total,
                            progress.percent()
                        )),
                );
                if ui.button(&strings.controls.cancel).clicked() {
                    cancel = true;
                }
            });
        if cancel {
            self.downloads.cancel();
        }
    }
}

impl App for VoiceBrowserApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.poll_auth(ctx);
        self.poll_status(ctx);
        self.poll_taxonomy(ctx);
        self.poll_manifest(ctx);
        self.poll_playback(ctx);
        self.poll_downloads(ctx);
        self.poll_single_download(ctx);

        let strings = self.strings();

        egui::TopBottomPanel::top("topbar").show(ctx, |ui| {
            self.show_top_bar(ui, &strings);
        });

        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            if let Some(err) = &self.error_text {
                ui.colored_label(Color32::from_rgb(200, 60, 60), err);
            } else if let Some(msg) = &self.player_error {
                ui.colored_label(Color32::from_rgb(200, 60, 60), msg);
            } else if let Some(msg) = &self.status_text {
                ui.label(msg);
            }
            ui.label(RichText::new(&strings.footer.disclaimer).small());
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.gate.is_unlocked() {
                self.show_main(ui, &strings);
            } else {
                self.show_auth(ui, &strings);
            }
        });

        self.show_confirmation(ctx, &strings);
        self.show_progress(ctx, &strings);

        // Keep the status countdown ticking.
        ctx.request_repaint_after(Duration::from_secs(30));
    }
}

fn time_label(player: &AudioPlayer) -> String {
    let elapsed = player.elapsed().as_secs();
    match player.duration() {
        Some(total) => {
            let total = total.as_secs();
            format!(
                "{}:{:02} / {}:{:02}",
                elapsed.min(total) / 60,
                elapsed.min(total) % 60,
                total / 60,
                total % 60
            )
        }
        None => format!("{}:{:02}", elapsed / 60, elapsed % 60),
    }
}
