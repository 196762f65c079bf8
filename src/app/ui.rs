use super::{ActionProgress, MeagleUploader};
use eframe::egui::{self, Align, Align2, Color32, RichText};
use meagle_uploader::api::{AssetId, FolderId};
use meagle_uploader::facets::{FacetDimension, FacetOptions, StoreEvent};
use meagle_uploader::upload::{DuplicateChoice, UploadStatus};
use meagle_uploader::utils::byte_size::ByteSize;
use meagle_uploader::utils::color::ColorExt;
use rfd::FileDialog;

const ACCENT: Color32 = Color32::from_rgb(161, 89, 225);
const ERROR: Color32 = Color32::from_rgb(220, 50, 50);

/// Clicks collected during a frame and applied once rendering is done.
#[derive(Default)]
struct FrameActions {
    store: Vec<StoreEvent>,
    delete_folder: Option<FolderId>,
    toggle_notes: Option<AssetId>,
    delete_note: Option<i64>,
    add_note: bool,
    create_folder: bool,
    save_smart_folder: bool,
    delete_selected: bool,
    apply_connection: bool,
    pick_files: bool,
    pick_folder: bool,
}

impl MeagleUploader {
    pub fn render(&mut self, ctx: &egui::Context) {
        let mut actions = FrameActions::default();

        egui::SidePanel::left("filters")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_filters(ui, &mut actions);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let total_height = ui.available_height();
            let footer_height = 40.0;
            let footer_margin = 15.0;
            let content_height = total_height - footer_height - footer_margin;

            egui::ScrollArea::vertical()
                .max_height(content_height)
                .show(ui, |ui| {
                    ui.add_space(20.0);
                    ui.vertical_centered(|ui| {
                        ui.heading("Media Library Uploader");
                        ui.add_space(5.0);
                        ui.label(
                            RichText::new("Drop files or folders anywhere in this window")
                                .color(ui.visuals().text_color().gamma_multiply(0.7)),
                        );
                    });

                    ui.add_space(20.0);
                    self.render_connection(ui, &mut actions);
                    ui.add_space(10.0);
                    self.render_target(ui, &mut actions);
                    ui.add_space(20.0);
                    self.render_progress(ui);

                    if !self.state.file_statuses.is_empty() {
                        ui.add_space(10.0);
                        self.render_details(ui);
                    }

                    ui.add_space(20.0);
                    self.render_assets(ui, &mut actions);
                });

            ui.with_layout(egui::Layout::bottom_up(Align::Center), |ui| {
                ui.add_space(footer_margin);
                self.render_footer(ui);
            });
        });

        self.render_duplicate_dialog(ctx);
        self.perform(actions, ctx);
    }

    fn perform(&mut self, actions: FrameActions, ctx: &egui::Context) {
        for event in actions.store {
            self.dispatch_store(event, ctx);
        }
        if let Some(folder_id) = actions.delete_folder {
            self.delete_folder(folder_id, ctx);
        }
        if let Some(asset_id) = actions.toggle_notes {
            self.toggle_notes(asset_id, ctx);
        }
        if let Some(annotation_id) = actions.delete_note {
            self.delete_note(annotation_id, ctx);
        }
        if actions.add_note {
            self.add_note(ctx);
        }
        if actions.create_folder {
            self.create_folder(ctx);
        }
        if actions.save_smart_folder {
            self.save_smart_folder(ctx);
        }
        if actions.delete_selected {
            self.delete_selected(ctx);
        }
        if actions.apply_connection {
            self.apply_connection(ctx);
        }
        if actions.pick_files {
            if let Some(paths) = FileDialog::new().pick_files() {
                self.upload_paths(paths, ctx);
            }
        }
        if actions.pick_folder {
            if let Some(path) = FileDialog::new().pick_folder() {
                self.upload_paths(vec![path], ctx);
            }
        }
    }

    fn render_connection(&mut self, ui: &mut egui::Ui, actions: &mut FrameActions) {
        egui::CollapsingHeader::new(format!("Library: {}", self.config.api_base))
            .default_open(false)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Paste a curl request copied from the library web app");
                    ui.add_space(4.0);
                    ui.label("ℹ").on_hover_text_at_pointer(
                        "The URL sets the backend address and the -H headers\n\
                        (cookies, authorization) are sent with every request.",
                    );
                });
                ui.add_space(8.0);
                let text_edit = egui::TextEdit::multiline(&mut self.curl_text)
                    .desired_width(ui.available_width())
                    .desired_rows(4)
                    .font(egui::TextStyle::Monospace)
                    .hint_text("curl 'http://127.0.0.1:8000/api/assets' -H 'Cookie: ...'");
                ui.add(text_edit);
                ui.add_enabled_ui(!self.curl_text.trim().is_empty(), |ui| {
                    if ui.button("Connect").clicked() {
                        actions.apply_connection = true;
                    }
                });
            });
    }

    fn render_target(&mut self, ui: &mut egui::Ui, actions: &mut FrameActions) {
        let selected = self.store.selected_folder();
        let selected_label = selected
            .and_then(|id| self.meta.folders.iter().find(|f| f.id == id))
            .map(|f| f.path.clone())
            .unwrap_or_else(|| "All assets (no upload target)".to_string());

        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.label("Folder:");
                egui::ComboBox::from_id_source("target_folder")
                    .selected_text(selected_label)
                    .width(240.0)
                    .show_ui(ui, |ui| {
                        if ui.selectable_label(selected.is_none(), "All assets").clicked() {
                            actions.store.push(StoreEvent::SelectFolder(None));
                        }
                        for folder in &self.meta.folders {
                            let label = if folder.path.is_empty() {
                                folder.name.as_str()
                            } else {
                                folder.path.as_str()
                            };
                            if ui
                                .selectable_label(selected == Some(folder.id), label)
                                .clicked()
                            {
                                actions.store.push(StoreEvent::SelectFolder(Some(folder.id)));
                            }
                        }
                    });
                if let Some(folder_id) = selected {
                    if ui.button("🗑").on_hover_text("Delete this folder").clicked() {
                        actions.delete_folder = Some(folder_id);
                    }
                }
            });

            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.new_folder_name)
                        .hint_text("New folder name")
                        .desired_width(180.0),
                );
                if ui.button("➕ Create").clicked() {
                    actions.create_folder = true;
                }
            });

            ui.horizontal(|ui| {
                ui.label("Tags:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.tag_text)
                        .hint_text("comma,separated")
                        .desired_width(240.0),
                );
            });

            ui.add_space(8.0);
            let busy = self.state.is_uploading || self.state.is_deleting;
            ui.horizontal(|ui| {
                ui.add_enabled_ui(!busy, |ui| {
                    if ui
                        .add(egui::Button::new("📤 Add Files").min_size(egui::vec2(120.0, 32.0)))
                        .clicked()
                    {
                        actions.pick_files = true;
                    }
                    if ui
                        .add(egui::Button::new("📁 Add Folder").min_size(egui::vec2(120.0, 32.0)))
                        .clicked()
                    {
                        actions.pick_folder = true;
                    }
                });
            });
        });
    }

    fn render_progress(&self, ui: &mut egui::Ui) {
        if matches!(self.state.progress, ActionProgress::NotStarted) {
            return;
        }
        ui.group(|ui| {
            if let Some(current_file) = &self.state.current_file {
                let status_text = match &self.state.progress {
                    ActionProgress::Completed { failed, .. } if *failed > 0 => "Finished with errors",
                    ActionProgress::Completed { .. } => "Complete",
                    _ if self.state.is_deleting => "🗑 Deleting",
                    _ => "📤 Uploading",
                };
                ui.label(format!("{}: {}", status_text, current_file));
            }

            let progress_bar = egui::ProgressBar::new(self.state.get_progress_percentage())
                .show_percentage()
                .animate(false)
                .fill(ACCENT);
            ui.add(progress_bar);
            ui.label(self.state.get_status_text());

            for error in &self.state.file_errors {
                ui.colored_label(ERROR, error);
            }
        });
    }

    fn render_details(&mut self, ui: &mut egui::Ui) {
        if ui
            .button(if self.state.show_details {
                "Hide Details"
            } else {
                "Show Details"
            })
            .clicked()
        {
            self.state.show_details = !self.state.show_details;
        }

        if self.state.show_details {
            egui::ScrollArea::vertical()
                .id_source("file_details")
                .max_height(200.0)
                .show(ui, |ui| {
                    egui::Frame::none()
                        .fill(ui.style().visuals.extreme_bg_color)
                        .show(ui, |ui| {
                            ui.add_space(8.0);
                            for status in &self.state.file_statuses {
                                ui.horizontal(|ui| match &status.status {
                                    UploadStatus::Uploading => {
                                        ui.label("⏳");
                                        ui.colored_label(
                                            Color32::from_rgb(150, 150, 150),
                                            format!("{} - Uploading...", status.key()),
                                        );
                                    }
                                    UploadStatus::Success => {
                                        ui.label("✅");
                                        ui.colored_label(Color32::from_rgb(0, 180, 0), status.key());
                                    }
                                    UploadStatus::Error(err) => {
                                        ui.label("❌");
                                        ui.colored_label(ERROR, format!("{} - {}", status.key(), err));
                                    }
                                });
                                ui.add_space(4.0);
                            }
                            ui.add_space(8.0);
                        });
                });
        }
    }

    fn render_filters(&mut self, ui: &mut egui::Ui, actions: &mut FrameActions) {
        ui.heading("Filters");
        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.search_text)
                    .hint_text("Search")
                    .desired_width(150.0),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                actions.store.push(StoreEvent::Search(self.search_text.clone()));
            }
            if ui.small_button("✖").on_hover_text("Clear filters").clicked() {
                self.search_text.clear();
                actions.store.push(StoreEvent::ClearFilters);
            }
        });

        ui.separator();
        ui.label(RichText::new("Format").strong());
        if let Some(snapshot) = self.store.facet(FacetDimension::Format) {
            if let FacetOptions::Formats(formats) = &snapshot.options {
                for format in formats {
                    let mut active = self.store.filters.formats.contains(format);
                    if ui.checkbox(&mut active, format.to_uppercase()).changed() {
                        actions.store.push(StoreEvent::ToggleFormat(format.clone()));
                    }
                }
            }
        }

        ui.separator();
        ui.label(RichText::new("Color").strong());
        if let Some(snapshot) = self.store.facet(FacetDimension::Color) {
            if let FacetOptions::Colors(groups) = &snapshot.options {
                ui.horizontal_wrapped(|ui| {
                    for group in groups {
                        let active = self.store.filters.colors.contains(&group.hex);
                        let fill = Color32::from_rgb_value(group.centroid);
                        let mark = if active { "✔" } else { " " };
                        let swatch = egui::Button::new(RichText::new(mark).color(Color32::WHITE))
                            .fill(fill)
                            .min_size(egui::vec2(22.0, 22.0));
                        if ui
                            .add(swatch)
                            .on_hover_text(format!("{} ({})", group.hex, group.count))
                            .clicked()
                        {
                            actions.store.push(StoreEvent::ToggleColor(group.hex.clone()));
                        }
                    }
                });
            }
        }

        ui.separator();
        ui.label(RichText::new("Tags").strong());
        for tag in &self.meta.tags {
            let mut active = self.store.filters.tags.contains(&tag.name);
            if ui
                .checkbox(&mut active, format!("{} ({})", tag.name, tag.count))
                .changed()
            {
                actions.store.push(StoreEvent::ToggleTag(tag.name.clone()));
            }
        }

        ui.separator();
        ui.label(RichText::new("Notes").strong());
        for note in &self.meta.notes {
            let mut active = self
                .store
                .filters
                .annotations
                .contains(&note.text.to_lowercase());
            if ui
                .checkbox(&mut active, format!("{} ({})", note.text, note.count))
                .changed()
            {
                actions.store.push(StoreEvent::ToggleAnnotation(note.text.clone()));
            }
        }

        ui.separator();
        ui.label(RichText::new("Smart folders").strong());
        for smart in &self.meta.smart_folders {
            if ui
                .link(smart.name.as_str())
                .on_hover_text(smart.query.to_string())
                .clicked()
            {
                actions.store.push(StoreEvent::OpenSmartFolder(smart.id));
            }
        }
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.smart_folder_name)
                    .hint_text("Save filters as...")
                    .desired_width(150.0),
            );
            if ui.small_button("💾").clicked() {
                actions.save_smart_folder = true;
            }
        });
    }

    fn render_assets(&mut self, ui: &mut egui::Ui, actions: &mut FrameActions) {
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("{} assets", self.store.assets.len())).strong());
            let can_delete = !self.meta.selected_assets.is_empty()
                && !self.state.is_uploading
                && !self.state.is_deleting;
            ui.add_enabled_ui(can_delete, |ui| {
                if ui
                    .button(format!("🗑 Delete selected ({})", self.meta.selected_assets.len()))
                    .clicked()
                {
                    actions.delete_selected = true;
                }
            });
        });

        if let Some(notice) = &self.store.notice {
            ui.colored_label(ERROR, notice);
        }

        egui::Frame::none()
            .fill(ui.style().visuals.extreme_bg_color)
            .inner_margin(6.0)
            .show(ui, |ui| {
                for asset in &self.store.assets {
                    ui.horizontal(|ui| {
                        let mut selected = self.meta.selected_assets.contains(&asset.id);
                        if ui.checkbox(&mut selected, asset.filename.as_str()).changed() {
                            if selected {
                                self.meta.selected_assets.insert(asset.id);
                            } else {
                                self.meta.selected_assets.remove(&asset.id);
                            }
                        }
                        ui.label(
                            RichText::new(format!(
                                "{} · {}",
                                asset.format.as_deref().unwrap_or(&asset.media_type),
                                ByteSize(asset.size_bytes)
                            ))
                            .color(ui.visuals().text_color().gamma_multiply(0.6)),
                        );
                        for hex in asset.colors.iter().take(5) {
                            if let Some(color) = <Color32 as ColorExt>::from_hex(hex) {
                                ui.colored_label(color, "■");
                            }
                        }
                        if ui.small_button("📝").on_hover_text("Notes").clicked() {
                            actions.toggle_notes = Some(asset.id);
                        }
                    });

                    if self.meta.note_asset == Some(asset.id) {
                        ui.indent(("notes", asset.id), |ui| {
                            for note in &self.meta.asset_notes {
                                ui.horizontal(|ui| {
                                    ui.label(note.text().unwrap_or("(non-text annotation)"));
                                    if ui.small_button("🗑").clicked() {
                                        actions.delete_note = Some(note.id);
                                    }
                                });
                            }
                            ui.horizontal(|ui| {
                                ui.add(
                                    egui::TextEdit::singleline(&mut self.note_text)
                                        .hint_text("Add a note")
                                        .desired_width(200.0),
                                );
                                if ui.small_button("➕").clicked() {
                                    actions.add_note = true;
                                }
                            });
                        });
                    }
                }
            });
    }

    fn render_duplicate_dialog(&mut self, ctx: &egui::Context) {
        let Some(pending) = &self.state.pending_duplicate else {
            return;
        };
        let mut choice = None;
        egui::Window::new("Duplicate files")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!(
                    "{} file(s) already exist in this folder.",
                    pending.report.count
                ));
                for name in &pending.report.sample {
                    ui.label(format!("• {}", name));
                }
                if pending.report.count > pending.report.sample.len() {
                    ui.label(format!(
                        "…and {} more",
                        pending.report.count - pending.report.sample.len()
                    ));
                }
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Keep both").clicked() {
                        choice = Some(DuplicateChoice::KeepBoth);
                    }
                    if ui
                        .button(RichText::new("Replace existing").color(ERROR))
                        .clicked()
                    {
                        choice = Some(DuplicateChoice::Replace);
                    }
                });
            });
        if let Some(choice) = choice {
            self.answer_duplicates(choice);
        }
    }

    fn render_footer(&self, ui: &mut egui::Ui) {
        ui.horizontal_centered(|ui| {
            if ui
                .add(
                    egui::Label::new(RichText::new("Open library in browser").color(ACCENT))
                        .sense(egui::Sense::click()),
                )
                .clicked()
            {
                let _ = open::that(self.library_url());
            }
        });

        if let Some(error) = &self.state.error_message {
            ui.add_space(5.0);
            ui.vertical_centered(|ui| {
                ui.colored_label(ERROR, error);
            });
        }
    }

    /// The web front end lives at the backend root, one level above `/api`.
    fn library_url(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        base.strip_suffix("/api").unwrap_or(base).to_string()
    }
}
