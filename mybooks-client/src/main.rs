use dotenvy::dotenv;
use mybooks_client::config::get_configuration;
use mybooks_client::models::PageRequest;
use mybooks_client::MyBooks;
use mybooks_core::observability::logging::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    if let Err(e) = init_tracing("mybooks-client", &configuration.log_level) {
        eprintln!("Tracing already initialized: {}", e);
    }

    let app = MyBooks::from_settings(&configuration)
        .map_err(|e| anyhow::anyhow!("Failed to build client: {}", e))?;
    let _watcher = app.watch_session();
    app.init().await;

    let categories = app.services.categories.list().await;
    let books = app.services.books.list(&PageRequest::new(0, 20).into()).await;

    info!(
        backend = app.api().backend_name(),
        authenticated = app.session().is_authenticated(),
        categories = categories.len(),
        books = books.total_elements,
        basket_items = app.basket.item_count(),
        "Catalog loaded"
    );

    for book in &books.content {
        println!("{:>4}  {:<40} {:>8}", book.id, book.title, book.price);
    }

    if let Ok(metrics) = mybooks_client::services::metrics::get_metrics() {
        tracing::debug!(%metrics, "Client metrics");
    }
    Ok(())
}
