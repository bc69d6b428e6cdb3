//! Basic example of the hearth core.

use std::sync::Arc;

use async_trait::async_trait;
use hearth::prelude::*;
use hearth::lifecycle::EVENT_STARTED;
use parking_lot::Mutex;
use serde_json::{Value, json};

// === A couple of services ===

struct Settings {
    locale: String,
}

/// Mount table shared by everyone who makes `app/vfs`.
#[derive(Default)]
struct Mounts(Mutex<Vec<String>>);

impl Mounts {
    fn mount(&self, name: &str) {
        self.0.lock().push(name.to_string());
    }

    fn list(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

// === Providers ===

/// Loaded by `boot()`: everything else reads settings.
struct SettingsProvider {
    core: Core,
}

#[async_trait]
impl Provider for SettingsProvider {
    fn provides(&self) -> Vec<String> {
        vec!["app/settings".into()]
    }

    async fn init(&self) -> Result<(), ProviderError> {
        let locale = self
            .core
            .config_as::<String>("locale")
            .unwrap_or_else(|| "en_EN".into());

        self.core.singleton("app/settings", move |_| {
            Ok(Settings {
                locale: locale.clone(),
            })
        });
        Ok(())
    }
}

/// Loaded by `start()`: mounts the filesystems named in its args.
struct VfsProvider {
    core: Core,
    mounts: Vec<String>,
}

#[async_trait]
impl Provider for VfsProvider {
    fn provides(&self) -> Vec<String> {
        vec!["app/vfs".into(), "app/vfs-request".into()]
    }

    async fn init(&self) -> Result<(), ProviderError> {
        let settings: Arc<Settings> = self.core.make("app/settings", &[])?;
        tracing::info!(locale = %settings.locale, "VFS sees settings");

        self.core.singleton("app/vfs", |_| Ok(Mounts::default()));

        // One request object per call, labelled by the caller.
        self.core.instance("app/vfs-request", |args: &[Value]| {
            let path = args.first().and_then(Value::as_str).unwrap_or("/");
            Ok(format!("request for {path}"))
        });
        Ok(())
    }

    fn start(&self) -> Result<(), ProviderError> {
        let vfs: Arc<Mounts> = self.core.make("app/vfs", &[])?;
        for name in &self.mounts {
            vfs.mount(name);
        }
        Ok(())
    }

    fn destroy(&self) -> Result<(), ProviderError> {
        tracing::info!("VFS unmounted");
        Ok(())
    }
}

/// Fails to initialize; the core logs it and carries on.
struct FlakyProvider;

#[async_trait]
impl Provider for FlakyProvider {
    async fn init(&self) -> Result<(), ProviderError> {
        Err("upstream unavailable".into())
    }
}

#[tokio::main]
async fn main() -> hearth::Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("hearth=debug,hearth_core=debug,basic=info")
        .init();

    let core = Core::new(
        "demo",
        json!({"locale": "en_EN", "vfs": {"mounts": ["home"]}}),
        json!({"locale": "nb_NO", "vfs": {"mounts": ["shared"]}}),
        json!({}),
    );

    core.on(EVENT_STARTED, |ok| tracing::info!(%ok, "Started event"));

    core.register(
        |core, _| Ok(SettingsProvider { core: core.clone() }),
        RegisterOptions::early(),
    );
    core.register(
        |core, args| {
            let mounts = args
                .and_then(|a| serde_json::from_value(a["mounts"].clone()).ok())
                .unwrap_or_default();
            Ok(VfsProvider {
                core: core.clone(),
                mounts,
            })
        },
        RegisterOptions::default().with_args(json!({
            "mounts": core.config_or("vfs.mounts", json!([])),
        })),
    );
    core.register(|_, _| Ok(FlakyProvider), RegisterOptions::default());

    println!("✅ Registered: {:?}", core.providers());

    core.boot().await;
    let started = core.start().await;
    println!("🚀 Started: {started:?}");

    let vfs: Arc<Mounts> = core.make("app/vfs", &[])?;
    println!("📂 Mounts: {:?}", vfs.list());

    let request: Arc<String> = core.make("app/vfs-request", &[json!("/home/demo")])?;
    println!("📨 {request}");

    if let Err(e) = core.make::<String>("app/vfs-reqest", &[]) {
        println!("❌ {e}");
    }

    core.destroy()?;
    println!("\n🎉 {core:?}");
    Ok(())
}
