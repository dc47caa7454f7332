use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "solar-prediction-rs",
    version,
    about = "Solar power forecasting service"
)]
pub struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
}
