mod app;
mod audio;
mod auth;
mod catalog;
mod constants;
mod download;
mod error;
mod i18n;
mod model;
mod naming;
mod playback;
mod selection;
mod settings;
mod task;

use std::path::Path;

use app::{Services, VoiceBrowserApp};
use auth::AuthClient;
use catalog::{build_http_client, CatalogClient};

fn configure_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();

    let mut try_add_font = |name: &str, path: &str| {
        if Path::new(path).exists() {
            if let Ok(bytes) = std::fs::read(path) {
                fonts
                    .font_data
                    .insert(name.to_owned(), egui::FontData::from_owned(bytes));
                fonts
                    .families
                    .entry(egui::FontFamily::Proportional)
                    .or_default()
                    .push(name.to_owned());
                fonts
                    .families
                    .entry(egui::FontFamily::Monospace)
                    .or_default()
                    .push(name.to_owned());
                log::info!("Loaded fallback font: {name} from {path}");
            }
        }
    };

    // Character names and the Japanese UI strings need CJK glyphs.
    let candidates: &[(&str, &str)] = &[
        ("NotoSansJP-Regular", "assets/fonts/NotoSansJP-Regular.otf"),
        ("NotoSansCJK-Regular", "assets/fonts/NotoSansCJK-Regular.ttc"),
        ("NotoSansJP-Regular", "/usr/share/fonts/opentype/noto/NotoSansJP-Regular.otf"),
        ("NotoSansCJK-Regular", "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc"),
        ("NotoSansCJK-Regular", "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc"),
        ("Hiragino", "/System/Library/Fonts/ヒラギノ角ゴシック W3.ttc"),
        ("MSGothic", "C:\\Windows\\Fonts\\msgothic.ttc"),
    ];

    for (name, path) in candidates {
        try_add_font(name, path);
    }

    ctx.set_fonts(fonts);
}

fn main() -> eframe::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = settings::load_settings();
    let http = match build_http_client(settings.request_timeout_secs) {
        Ok(http) => http,
        Err(err) => {
            log::error!("Cannot start without an HTTP client: {err}");
            std::process::exit(1);
        }
    };
    let services = Services {
        catalog: CatalogClient::with_client(http.clone(), &settings),
        auth: AuthClient::new(http, settings.api_base.clone()),
    };
    // Optional deep link, e.g. `?char=abc&category=happy&types=A,B`.
    let deep_link = std::env::args().nth(1);
    let remembered_password = std::env::var("VOICE_BROWSER_PASSWORD").ok();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([520.0, 820.0])
            .with_min_inner_size([380.0, 560.0])
            .with_transparent(false)
            .with_decorations(true)
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "voice-browser",
        native_options,
        Box::new(move |cc| {
            configure_fonts(&cc.egui_ctx);
            Box::new(VoiceBrowserApp::new(
                settings,
                services,
                deep_link.as_deref(),
                remembered_password,
            ))
        }),
    )
}
