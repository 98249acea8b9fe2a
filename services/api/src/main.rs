use customs_exam_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("customs-exam error: {err}");
        std::process::exit(1);
    }
}
