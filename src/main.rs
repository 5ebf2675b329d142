#[tokio::main]
async fn main() {
    jett_app_lib::run().await
}
