#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    eventsphere_backend::run().await;
}
