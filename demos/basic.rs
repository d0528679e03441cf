/* demos/basic.rs */

use live_aws::client::{MemoryAppConfig, MemoryParameterStore, SessionParams};
use live_aws::source::{AppConfigSource, ParameterStoreSource};
use live_aws::{Provider, ReloadEvent};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// 0. Seed in-memory stores
	let parameters = Arc::new(MemoryParameterStore::new());
	parameters.put_string("/demo/Db/Host", "db.local");
	parameters.put_string("/demo/Db/Port", "5432");

	let app_config = Arc::new(MemoryAppConfig::new());
	let flags = SessionParams::new("demo", "dev", "flags");
	app_config.deploy(&flags, r#"{"NewCheckout":{"enabled":false}}"#);

	// 1. Parameter Store provider, polled every second
	let source = ParameterStoreSource::builder(parameters.clone())
		.path("/demo")
		.build()?;
	let settings = Provider::builder(source)
		.reload_after(Duration::from_secs(1))
		.on_change(|entry| println!("Parameters now at version {}", entry.meta.version))
		.build()?;

	// 2. AppConfig feature flag provider, reloaded by hand
	let source = AppConfigSource::builder(app_config.clone(), flags.clone()).build()?;
	let features = Provider::builder(source).build()?;

	// 3. Initial load
	settings.load().await?;
	features.load().await?;
	for (key, value) in settings.snapshot().iter() {
		println!("{key} = {value}");
	}
	println!(
		"FeatureManagement:NewCheckout = {:?}",
		features.get("FeatureManagement:NewCheckout")
	);

	// 4. Print reload events
	let mut events = settings.subscribe();
	let listener = tokio::spawn(async move {
		while let Ok(event) = events.recv().await {
			match event {
				ReloadEvent::Reloaded { old, new, .. } => {
					println!("Db:Host {:?} -> {:?}", old.get("Db:Host"), new.get("Db:Host"));
				}
				ReloadEvent::Failed { source, error } => println!("{source} failed: {error}"),
			}
		}
	});

	// 5. Change the stores and wait for the poll loop
	parameters.put_string("/demo/Db/Host", "db2.local");
	tokio::time::sleep(Duration::from_millis(1500)).await;

	app_config.deploy(&flags, r#"{"NewCheckout":{"enabled":true}}"#);
	if features.reload().await? {
		println!(
			"FeatureManagement:NewCheckout = {:?}",
			features.get("FeatureManagement:NewCheckout")
		);
	}

	// Cleanup
	settings.dispose().await;
	drop(settings);
	listener.await?;
	println!("Done.");
	Ok(())
}
