use std::collections::HashMap;
use std::time::Duration;

use eframe::{egui, Frame};
use egui::Context;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Result;

const SERVER: &str = "http://127.0.0.1:5000";

/// Token mode choice on the UI side, turned into the server's mode name.
#[derive(Debug, PartialEq)]
enum ModeChoice {
    Word,
    NGram,
}

/// REST context holding a reusable blocking HTTP client.
struct RESTContext {
    client: Client,
}

impl RESTContext {
    /// Creates a new REST context with a timeout.
    fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::new(5, 0))
            .build()?;
        Ok(Self { client })
    }

    /// Sends a request and returns the body, whatever the status.
    ///
    /// The server answers errors with a readable sentence, so it is shown as is.
    fn send(&self, request: RequestBuilder) -> Result<String> {
        request.send()?.text()
    }

    /// Sends a POST request to `/v1/messages`.
    fn post_message(&self, user: &str, content: &str, guild: &str, channel: &str) -> Result<String> {
        let mut body = HashMap::new();
        body.insert("user", user);
        body.insert("content", content);
        if !guild.is_empty() {
            body.insert("guild", guild);
        }
        if !channel.is_empty() {
            body.insert("channel", channel);
        }
        self.send(self.client.post(format!("{SERVER}/v1/messages")).json(&body))
    }

    /// Sends a GET request to `/v1/generate`, from a guild channel when given.
    fn get_generated(&self, user: &str, guild: &str, channel: &str) -> Result<String> {
        let mut query = vec![("user", user)];
        if !guild.is_empty() {
            query.push(("guild", guild));
        }
        if !channel.is_empty() {
            query.push(("channel", channel));
        }
        self.send(self.client.get(format!("{SERVER}/v1/generate")).query(&query))
    }

    /// Sends a GET request to `/v1/users`.
    fn get_users(&self) -> Result<String> {
        let response = self.client
            .get(format!("{SERVER}/v1/users"))
            .send()?
            .error_for_status()?;
        response.text()
    }

    /// Sends a PUT request to `/v1/users/{user}/{action}` (`enable` or `disable`).
    fn put_user_action(&self, user: &str, action: &str) -> Result<String> {
        self.send(self.client.put(format!("{SERVER}/v1/users/{user}/{action}")))
    }

    /// Sends a PUT request to `/v1/users/{user}/config`.
    fn put_config(&self, user: &str, mode: &str, depth: usize) -> Result<String> {
        let depth = depth.to_string();
        self.send(
            self.client
                .put(format!("{SERVER}/v1/users/{user}/config"))
                .query(&[("mode", mode), ("depth", depth.as_str())]),
        )
    }

    /// Sends a DELETE request to `/v1/users/{user}/chain`.
    fn delete_chain(&self, user: &str) -> Result<String> {
        self.send(self.client.delete(format!("{SERVER}/v1/users/{user}/chain")))
    }
}

/// Global UI state (MUST persist between frames in egui).
struct MarkovUI {
    rest: RESTContext,
    last_text: Option<String>,
    status: Option<String>,

    user: String,
    known_users: Vec<String>,
    message: String,
    guild: String,
    channel: String,

    mode: ModeChoice,
    ngram_length: usize,
    depth: usize,
}

impl MarkovUI {
    /// Initializes the UI with sane defaults.
    fn new() -> Result<Self> {
        let mut ui = Self {
            rest: RESTContext::new()?,
            last_text: None,
            status: None,

            user: String::new(),
            known_users: Vec::new(),
            message: String::new(),
            guild: String::new(),
            channel: String::new(),

            mode: ModeChoice::Word,
            ngram_length: 3,
            depth: 1,
        };
        ui.get_users();
        Ok(ui)
    }

    /// Mode name as understood by the server.
    fn mode_name(&self) -> String {
        match self.mode {
            ModeChoice::Word => "word".to_owned(),
            ModeChoice::NGram => format!("ngram:{}", self.ngram_length),
        }
    }

    fn report(&mut self, result: Result<String>) {
        self.status = Some(match result {
            Ok(text) => text,
            Err(e) => format!("Error: {e}"),
        });
    }

    fn get_users(&mut self) {
        match self.rest.get_users() {
            Ok(users) => {
                self.known_users = users
                    .split('\n')
                    .map(|s| s.trim().to_owned())
                    .filter(|s| !s.is_empty())
                    .collect()
            }
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
    }

    fn post_message(&mut self) {
        let result = self.rest.post_message(&self.user, &self.message, &self.guild, &self.channel);
        if result.is_ok() {
            self.message.clear();
        }
        self.report(result);
    }

    fn get_generated(&mut self) {
        match self.rest.get_generated(&self.user, &self.guild, &self.channel) {
            Ok(text) => self.last_text = Some(text),
            Err(e) => self.last_text = Some(format!("Error: {e}")),
        }
    }

    fn put_user_action(&mut self, action: &str) {
        let result = self.rest.put_user_action(&self.user, action);
        self.report(result);
        self.get_users();
    }

    fn put_config(&mut self) {
        let result = self.rest.put_config(&self.user, &self.mode_name(), self.depth);
        self.report(result);
    }

    fn delete_chain(&mut self) {
        let result = self.rest.delete_chain(&self.user);
        self.report(result);
    }
}

impl eframe::App for MarkovUI {
    /// UI update loop (called every frame).
    fn update(&mut self, ctx: &Context, _: &mut Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {

            egui::Grid::new("markov_grid")
                .num_columns(2)
                .spacing([20.0, 6.0])
                .striped(true)
                .show(ui, |ui| {

                    // user
                    ui.label("User");
                    egui::ComboBox::from_id_salt("known_users")
                        .selected_text(&self.user)
                        .show_ui(ui, |ui| {
                            for user in &self.known_users {
                                ui.selectable_value(&mut self.user, user.clone(), user);
                            }
                        });
                    ui.end_row();

                    ui.label("User id");
                    ui.text_edit_singleline(&mut self.user);
                    ui.end_row();

                    // opt in / out
                    ui.horizontal(|ui| {
                        if ui.button("Enable").clicked() {
                            self.put_user_action("enable");
                        }
                        if ui.button("Disable").clicked() {
                            self.put_user_action("disable");
                        }
                    });
                    if ui.button("Reset chain").clicked() {
                        self.delete_chain();
                    }
                    ui.end_row();

                    ui.separator();
                    ui.end_row();

                    // mode
                    ui.label("Token mode");
                    ui.vertical(|ui| {
                        ui.radio_value(&mut self.mode, ModeChoice::Word, "Words");
                        ui.radio_value(&mut self.mode, ModeChoice::NGram, "N-grams");
                    });
                    ui.end_row();

                    if self.mode == ModeChoice::NGram {
                        ui.label("N-gram length");
                        ui.add(
                            egui::DragValue::new(&mut self.ngram_length)
                                .range(1..=16)
                                .speed(1),
                        );
                        ui.end_row();
                    }

                    // depth
                    ui.label("Chain depth");
                    ui.add(
                        egui::DragValue::new(&mut self.depth)
                            .range(1..=8)
                            .speed(1),
                    );
                    ui.end_row();

                    ui.label("");
                    if ui.button("Apply settings").clicked() {
                        self.put_config();
                    }
                    ui.end_row();

                    ui.separator();
                    ui.end_row();

                    // message
                    ui.label("Guild / channel");
                    ui.horizontal(|ui| {
                        ui.add(egui::TextEdit::singleline(&mut self.guild).desired_width(100.0));
                        ui.add(egui::TextEdit::singleline(&mut self.channel).desired_width(100.0));
                    });
                    ui.end_row();

                    ui.label("Message");
                    ui.text_edit_multiline(&mut self.message);
                    ui.end_row();

                    ui.label("");
                    if ui.button("Send").clicked() {
                        self.post_message();
                    }
                    ui.end_row();

                    ui.separator();
                    ui.end_row();

                    // Generate button
                    if ui
                        .add_sized([200.0, 40.0], egui::Button::new("Generate"))
                        .clicked()
                    {
                        self.get_generated();
                    }

                    // Output
                    if let Some(text) = &self.last_text {
                        ui.label(text);
                    } else {
                        ui.label("Click Generate to start");
                    }
                    ui.end_row();
                });

            if let Some(status) = &self.status {
                ui.separator();
                ui.label(status);
            }
        });
    }
}

/// Application entry point.
fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 520.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "markov",
        options,
        Box::new(|_| Ok(Box::new(MarkovUI::new()?))),
    )
}
