use marketplace::configuration::get_configuration;
use marketplace::email_client::EmailClient;
use marketplace::startup::run;
use marketplace::telemetry::init_telemetry;
use marketplace::users::PgUserRepository;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

fn invalid_input(message: &'static str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, message)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // 구조화된 로깅 초기화
    init_telemetry();

    tracing::info!("Starting application");

    // 설정 로드
    let configuration = get_configuration().map_err(|e| {
        tracing::error!("Failed to read configuration: {}", e);
        invalid_input("Configuration error")
    })?;
    configuration.auth.validate().map_err(|e| {
        tracing::error!("Invalid auth configuration: {}", e);
        invalid_input("Configuration error")
    })?;
    tracing::info!("Configuration loaded successfully");

    // 데이터베이스 연결 풀 생성
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
    })?;
    tracing::info!("Database ready");

    // 메일 클라이언트
    let sender = configuration.email_client.sender().map_err(|e| {
        tracing::error!("Invalid sender email: {}", e);
        invalid_input("Configuration error")
    })?;
    let email_client = EmailClient::new(
        configuration.email_client.base_url.clone(),
        sender,
        configuration.email_client.timeout(),
    )
    .map_err(|e| {
        tracing::error!("Failed to build email client: {}", e);
        invalid_input("Email client error")
    })?;

    // 서버 주소 설정
    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(
        listener,
        &configuration,
        Arc::new(PgUserRepository::new(pool)),
        Arc::new(email_client),
    )?;

    server.await
}
