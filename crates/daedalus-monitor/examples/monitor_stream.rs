use std::sync::Arc;

use daedalus_monitor::prelude::*;
use daedalus_monitor::session::FileUserIdStore;
use daedalus_monitor::vendors::adk::AdkBackend;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), MonitorError> {
    daedalus_monitor::observability::init_observability("info");

    let monitor = Monitor::builder()
        .backend(Arc::new(AdkBackend::from_env()?))
        .user_id_store(Arc::new(FileUserIdStore::from_env()))
        .build()?;

    let mut run = monitor.start_run("Order ID: demo").await?;
    while let Some(update) = run.next_update().await {
        match update {
            MonitorUpdate::StageEntered { author, .. } => println!("== {author}"),
            MonitorUpdate::EventAppended { event, .. } => println!("   {}", event.title),
            MonitorUpdate::Failed { failure, .. } => eprintln!("{}", failure.alert()),
            MonitorUpdate::Completed { .. } => println!("done"),
            MonitorUpdate::StateChanged { .. } | MonitorUpdate::SessionReady { .. } => {}
        }
    }

    let report = run.finish().await?;
    println!("{} events, {} stages", report.view.events().len(), report.view.stages().len());
    Ok(())
}
