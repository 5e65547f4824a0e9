use std::fmt::{Debug, Display};

use career_guide::career_guide_web_server::CareerGuideWebServer;
use career_guide::core::{get_subscriber, init_subscriber, AppConfig};
use tokio::task::JoinError;

use colored::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::new()?;

    let file_appender = tracing_appender::rolling::daily(&config.log.directory, "app");
    let subscriber = get_subscriber("career_guide".into(), config.log.level.clone(), file_appender);
    init_subscriber(subscriber);

    let career_guide_web_server = CareerGuideWebServer::build(config.clone()).await?;
    let port = career_guide_web_server.port();

    let server_task = tokio::spawn(career_guide_web_server.run_until_stopped());

    println!("{}", "-----------------------------------------".green());
    println!(
        "{}",
        format!(
            "🚀 Server started on Addr: {}:{}",
            config.career_guide_server_config.host, port
        )
        .bold()
    );
    println!("{}", "-----------------------------------------".green());

    tokio::select! {
        outcome = server_task => report_exit("career_guide_web_server", outcome),
    }
    Ok(())
}

fn report_exit(task_name: &str, outcome: Result<Result<(), impl Debug + Display>, JoinError>) {
    match outcome {
        Ok(Ok(())) => {
            tracing::info!("{} has exited", task_name)
        }
        Ok(Err(e)) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "{} failed",
                task_name
            )
        }
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "{}' task failed to complete",
                task_name
            )
        }
    }
}
