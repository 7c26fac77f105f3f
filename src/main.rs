use std::collections::HashMap;
use std::path::PathBuf;

use iced::widget::image::Handle;
use iced::widget::{button, column, container, row, scrollable, text, text_input, Column, Row};
use iced::{Alignment, Color, Element, Length, Size, Task, Theme};
use iced_aw::Wrap;
use image::imageops::FilterType;

mod error;
mod remote;
mod state;

use error::EditorError;
use remote::client::SyncClient;
use remote::urls;
use state::avatar::{AvatarState, Category};
use state::registry::AccessoryRegistry;
use state::session;

/// Display size of the composed-avatar preview
const PREVIEW_SIZE: (u32, u32) = (250, 375);
/// Display size of accessory thumbnails in the grid
const THUMBNAIL_SIZE: (u32, u32) = (60, 80);
/// Which screen is showing: token entry until a fetch succeeds, then the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    TokenEntry,
    Editor,
}

/// Main application state
struct BitmojiEditor {
    screen: Screen,
    client: SyncClient,
    /// The session token; empty until entered or loaded from disk.
    token: String,
    /// Where the token record lives once a fetch proves the token good.
    token_path: PathBuf,
    token_input: String,
    /// The fetched avatar. `None` until the first successful fetch.
    avatar: Option<AvatarState>,
    /// The user's local name → identifier catalog.
    registry: AccessoryRegistry,
    /// Composed-avatar preview, refreshed after every apply.
    preview: Option<Handle>,
    /// Accessory thumbnails, keyed by (category, identifier).
    thumbnails: HashMap<(Category, String), Handle>,
    /// Currently selected category tab.
    active_category: Category,
    name_input: String,
    id_input: String,
    /// Single-flight guard: true while a fetch or save is outstanding.
    busy: bool,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    TokenInput(String),
    /// User asked to start the session (or submitted the token input)
    StartSession,
    /// Background avatar fetch completed
    AvatarFetched(Result<AvatarState, EditorError>),
    /// Preview image arrived (or failed and degraded to nothing)
    PreviewLoaded(Option<Handle>),
    /// A single accessory thumbnail arrived
    ThumbnailLoaded(Category, String, Option<Handle>),
    CategorySelected(Category),
    NameInput(String),
    IdInput(String),
    AddAccessory,
    RemoveAccessory(Category, String),
    ApplyAccessory(Category, String),
    Save,
    /// Background save completed
    SaveFinished(Result<(), EditorError>),
    /// Post-save confirmation render arrived
    SavedImageLoaded(Option<Handle>),
}

impl BitmojiEditor {
    /// Create a new instance. A stored token starts the fetch immediately,
    /// so returning users land straight in the editor.
    fn new() -> (Self, Task<Message>) {
        let registry = AccessoryRegistry::load(&session::registry_path());
        let token = session::load_token().unwrap_or_default();

        let mut editor = BitmojiEditor {
            screen: Screen::TokenEntry,
            client: SyncClient::new(),
            token,
            token_path: session::token_path(),
            token_input: String::new(),
            avatar: None,
            registry,
            preview: None,
            thumbnails: HashMap::new(),
            active_category: Category::Hats,
            name_input: String::new(),
            id_input: String::new(),
            busy: false,
            status: "Enter your Bitmoji token to start.".to_string(),
        };

        let task = if editor.token.is_empty() {
            Task::none()
        } else {
            editor.start_fetch()
        };

        (editor, task)
    }

    /// Launch the one background avatar fetch. All further mutation waits
    /// for `AvatarFetched` to come back through `update`.
    fn start_fetch(&mut self) -> Task<Message> {
        self.busy = true;
        self.status = "Fetching your avatar...".to_string();

        let client = self.client.clone();
        let token = self.token.clone();
        Task::perform(
            async move { client.fetch_avatar(&token).await },
            Message::AvatarFetched,
        )
    }

    /// Refresh the composed-avatar preview for the current selections.
    fn refresh_preview(&self) -> Task<Message> {
        let Some(avatar) = &self.avatar else {
            return Task::none();
        };

        let client = self.client.clone();
        let url = urls::preview_url(avatar);
        Task::perform(
            async move { load_image(client, url, PREVIEW_SIZE).await },
            Message::PreviewLoaded,
        )
    }

    /// Fetch the thumbnail for one registry entry. Failures degrade to an
    /// imageless button, never an error.
    fn load_thumbnail(&self, category: Category, identifier: String) -> Task<Message> {
        let Some(avatar) = &self.avatar else {
            return Task::none();
        };

        let client = self.client.clone();
        let url = urls::thumbnail_url(category, &identifier, avatar);
        Task::perform(
            async move {
                let handle = load_image(client, url, THUMBNAIL_SIZE).await;
                (category, identifier, handle)
            },
            |(category, identifier, handle)| Message::ThumbnailLoaded(category, identifier, handle),
        )
    }

    /// Thumbnails for every registry entry, launched when the editor opens.
    fn load_all_thumbnails(&self) -> Task<Message> {
        let tasks: Vec<Task<Message>> = Category::ALL
            .into_iter()
            .flat_map(|category| {
                self.registry
                    .list(category)
                    .iter()
                    .map(move |accessory| (category, accessory.identifier.clone()))
                    .collect::<Vec<_>>()
            })
            .map(|(category, identifier)| self.load_thumbnail(category, identifier))
            .collect();

        Task::batch(tasks)
    }

    /// Write the registry through to disk after every mutation. An empty
    /// registry deletes the record instead.
    fn persist_registry(&self) {
        if let Err(e) = self.registry.save(&session::registry_path()) {
            eprintln!("⚠️  Could not write accessory record: {}", e);
        }
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TokenInput(value) => {
                self.token_input = value;
                Task::none()
            }
            Message::StartSession => {
                if self.busy {
                    return Task::none();
                }

                if self.token.is_empty() {
                    let entered = self.token_input.trim().to_string();
                    if entered.is_empty() {
                        self.status = "Please enter a Bitmoji token.".to_string();
                        return Task::none();
                    }
                    self.token = entered;
                }

                self.start_fetch()
            }
            Message::AvatarFetched(Ok(avatar)) => {
                self.busy = false;

                // The token is proven good; persist it now and never before.
                if let Err(e) = session::store_token_at(&self.token_path, &self.token) {
                    eprintln!("⚠️  Could not store token: {}", e);
                }

                self.avatar = Some(avatar);
                self.screen = Screen::Editor;
                self.status = "Avatar loaded. Pick a category and go wild.".to_string();

                Task::batch(vec![self.refresh_preview(), self.load_all_thumbnails()])
            }
            Message::AvatarFetched(Err(e)) => {
                self.busy = false;
                // Back to unauthenticated; leave the token in the input so
                // the user can retry or correct it. Nothing was written.
                self.token_input = std::mem::take(&mut self.token);
                self.status = format!("{}", e);
                Task::none()
            }
            Message::PreviewLoaded(handle) => {
                match handle {
                    Some(handle) => self.preview = Some(handle),
                    None => self.status = "Failed to load the preview image.".to_string(),
                }
                Task::none()
            }
            Message::ThumbnailLoaded(category, identifier, handle) => {
                if let Some(handle) = handle {
                    self.thumbnails.insert((category, identifier), handle);
                }
                Task::none()
            }
            Message::CategorySelected(category) => {
                self.active_category = category;
                Task::none()
            }
            Message::NameInput(value) => {
                self.name_input = value;
                Task::none()
            }
            Message::IdInput(value) => {
                self.id_input = value;
                Task::none()
            }
            Message::AddAccessory => {
                let category = self.active_category;
                let name = self.name_input.trim().to_string();
                let identifier = self.id_input.trim().to_string();

                if identifier.is_empty() {
                    let e = EditorError::Validation("Accessory ID cannot be empty".to_string());
                    self.status = format!("{}", e);
                    return Task::none();
                }

                match self.registry.add(category, name.clone(), identifier.clone()) {
                    Ok(()) => {
                        self.persist_registry();
                        self.name_input.clear();
                        self.id_input.clear();
                        self.status = format!("Added {} to {}.", name, category);
                        self.load_thumbnail(category, identifier)
                    }
                    Err(e) => {
                        self.status = format!("{}", e);
                        Task::none()
                    }
                }
            }
            Message::RemoveAccessory(category, name) => {
                self.registry.remove(category, &name);
                self.persist_registry();
                self.status = format!("Removed {} from {}.", name, category);
                Task::none()
            }
            Message::ApplyAccessory(category, identifier) => {
                if let Some(avatar) = &mut self.avatar {
                    avatar.apply(category, identifier);
                }
                self.refresh_preview()
            }
            Message::Save => {
                if self.busy {
                    return Task::none();
                }
                let Some(avatar) = self.avatar.clone() else {
                    return Task::none();
                };

                self.busy = true;
                self.status = "Saving your avatar...".to_string();

                let client = self.client.clone();
                let token = self.token.clone();
                Task::perform(
                    async move { client.save_avatar(&token, &avatar).await },
                    Message::SaveFinished,
                )
            }
            Message::SaveFinished(Ok(())) => {
                self.busy = false;

                let Some(avatar) = &mut self.avatar else {
                    return Task::none();
                };

                // The save landed remotely; the new render is addressed by
                // the advanced identifier. If the identifier doesn't parse,
                // the confirmation image is unreachable.
                match avatar.advance_session_version() {
                    Ok(()) => {
                        self.status = "✅ Avatar saved!".to_string();
                        let client = self.client.clone();
                        let url = urls::saved_avatar_url(&avatar.id);
                        // Decoded at the preview pane's size, since that is
                        // where the confirmation render is shown.
                        Task::perform(
                            async move { load_image(client, url, PREVIEW_SIZE).await },
                            Message::SavedImageLoaded,
                        )
                    }
                    Err(e) => {
                        self.status = format!("Saved, but: {}", e);
                        Task::none()
                    }
                }
            }
            Message::SaveFinished(Err(e)) => {
                // Local selections stay as they are; only the remote push failed.
                self.busy = false;
                self.status = format!("{}", e);
                Task::none()
            }
            Message::SavedImageLoaded(handle) => {
                if let Some(handle) = handle {
                    self.preview = Some(handle);
                    self.status = "✅ Avatar saved and re-rendered!".to_string();
                }
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let content = match self.screen {
            Screen::TokenEntry => self.view_token_entry(),
            Screen::Editor => self.view_editor(),
        };

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    fn view_token_entry(&self) -> Element<Message> {
        let content: Column<Message> = column![
            text("Bitmoji Editor").size(40),
            text_input("Paste your Bitmoji token", &self.token_input)
                .on_input(Message::TokenInput)
                .on_submit(Message::StartSession)
                .secure(true)
                .padding(10)
                .width(Length::Fixed(400.0)),
            button(if self.busy { "Loading..." } else { "Start" })
                .on_press(Message::StartSession)
                .padding(10),
            text(&self.status).size(16),
        ]
        .spacing(20)
        .padding(40)
        .align_x(Alignment::Center);

        content.into()
    }

    fn view_editor(&self) -> Element<Message> {
        let preview: Element<Message> = match &self.preview {
            Some(handle) => iced::widget::image(handle.clone())
                .width(Length::Fixed(PREVIEW_SIZE.0 as f32))
                .height(Length::Fixed(PREVIEW_SIZE.1 as f32))
                .into(),
            None => text("(no preview yet)").size(16).into(),
        };

        let save_button = if self.busy {
            button("Saving...").padding(10)
        } else {
            button("Save").on_press(Message::Save).padding(10)
        };

        let top = row![
            preview,
            column![save_button, text(&self.status).size(14)].spacing(10),
        ]
        .spacing(30)
        .align_y(Alignment::Center);

        let tabs: Row<Message> = Category::ALL
            .into_iter()
            .fold(row![].spacing(8), |tabs, category| {
                let label = text(category.label()).size(15);
                let tab = if category == self.active_category {
                    button(label).padding(8)
                } else {
                    button(label)
                        .on_press(Message::CategorySelected(category))
                        .padding(8)
                };
                tabs.push(tab)
            });

        let add_controls = row![
            text_input("Name", &self.name_input)
                .on_input(Message::NameInput)
                .padding(8)
                .width(Length::Fixed(160.0)),
            text_input("Option ID", &self.id_input)
                .on_input(Message::IdInput)
                .padding(8)
                .width(Length::Fixed(160.0)),
            button("+ Add").on_press(Message::AddAccessory).padding(8),
        ]
        .spacing(10);

        let grid = self.view_accessory_grid();

        let content: Column<Message> = column![top, tabs, add_controls, scrollable(grid)]
            .spacing(20)
            .padding(30)
            .align_x(Alignment::Center);

        content.into()
    }

    /// The active category's accessories as a wrapping grid of apply
    /// buttons, each with its thumbnail (when it loaded) and a remove button.
    fn view_accessory_grid(&self) -> Element<Message> {
        let category = self.active_category;

        let cells: Vec<Element<Message>> = self
            .registry
            .list(category)
            .iter()
            .map(|accessory| {
                let key = (category, accessory.identifier.clone());

                let face: Element<Message> = match self.thumbnails.get(&key) {
                    Some(handle) => column![
                        iced::widget::image(handle.clone())
                            .width(Length::Fixed(THUMBNAIL_SIZE.0 as f32))
                            .height(Length::Fixed(THUMBNAIL_SIZE.1 as f32)),
                        text(&accessory.name).size(13),
                    ]
                    .spacing(4)
                    .align_x(Alignment::Center)
                    .into(),
                    None => text(&accessory.name).size(13).into(),
                };

                let apply = button(face)
                    .on_press(Message::ApplyAccessory(
                        category,
                        accessory.identifier.clone(),
                    ))
                    .padding(8);

                let remove = button(text("✕").size(12))
                    .on_press(Message::RemoveAccessory(category, accessory.name.clone()))
                    .padding(4);

                row![apply, remove]
                    .spacing(4)
                    .align_y(Alignment::Start)
                    .into()
            })
            .collect();

        if cells.is_empty() {
            return text(format!("No saved {} yet. Add one above.", category.label()))
                .size(15)
                .into();
        }

        Wrap::with_elements(cells)
            .spacing(12.0)
            .line_spacing(12.0)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::custom(
            "Bitmoji".to_string(),
            iced::theme::Palette {
                background: Color::from_rgb8(0xE8, 0xF5, 0xE9),
                text: Color::from_rgb8(0x2E, 0x7D, 0x32),
                primary: Color::from_rgb8(0x66, 0xBB, 0x6A),
                success: Color::from_rgb8(0xA5, 0xD6, 0xA7),
                danger: Color::from_rgb8(0xC6, 0x28, 0x28),
            },
        )
    }
}

fn main() -> iced::Result {
    iced::application("Bitmoji Editor", BitmojiEditor::update, BitmojiEditor::view)
        .theme(BitmojiEditor::theme)
        .window_size(Size::new(800.0, 600.0))
        .centered()
        .run_with(BitmojiEditor::new)
}

/// Fetch an image and prepare it for display at a fixed size.
/// Runs in a background task; any failure degrades to `None`.
async fn load_image(client: SyncClient, url: String, size: (u32, u32)) -> Option<Handle> {
    let bytes = client.fetch_image(&url).await.ok()?;
    decode_to_handle(&bytes, size)
}

/// Decode raw image bytes and resize them to the display dimensions.
fn decode_to_handle(bytes: &[u8], (width, height): (u32, u32)) -> Option<Handle> {
    let decoded = image::load_from_memory(bytes).ok()?;
    let resized = decoded.resize_exact(width, height, FilterType::Lanczos3);
    Some(Handle::from_rgba(width, height, resized.to_rgba8().into_raw()))
}
