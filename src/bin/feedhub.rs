use feedhub::config::Config;
use feedhub::models::{AirQualitySample, AssetPage, WeatherSnapshot};
use feedhub::services::{CycleReport, FeedService};
use feedhub::FetchStatus;

use anyhow::{Context, Result};
use clap::{App, Arg, ArgMatches, SubCommand};
use log::info;
use serde_json::json;

fn parse_coord(matches: &ArgMatches, name: &str) -> Result<Option<f64>> {
    match matches.value_of(name) {
        Some(value) => {
            let parsed = value
                .trim()
                .parse::<f64>()
                .with_context(|| format!("invalid --{}: {}", name, value))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn build_config(matches: &ArgMatches) -> Result<Config> {
    let mut config = Config::from_env()?;

    let lat = parse_coord(matches, "lat")?.unwrap_or(config.lat);
    let lon = parse_coord(matches, "lon")?.unwrap_or(config.lon);
    config = config.with_location(lat, lon);

    if let Some(key) = matches.value_of("owm-key") {
        config = config.with_owm_api_key(key);
    }
    if let Some(key) = matches.value_of("coingecko-key") {
        config = config.with_coingecko_api_key(key);
    }
    if let Some(lang) = matches.value_of("lang") {
        config = config.with_lang(lang);
    }
    if matches.is_present("alerts") {
        config = config.with_alerts(true);
    }
    if let Some(cap) = matches.value_of("max-concurrency") {
        let cap = cap
            .parse::<usize>()
            .with_context(|| format!("invalid --max-concurrency: {}", cap))?;
        config = config.with_chart_max_concurrency(cap);
    }
    Ok(config)
}

fn print_status(source: &str, status: &FetchStatus) {
    println!("{:<12} {}", source, status);
}

fn print_weather(weather: &WeatherSnapshot) {
    println!("{:-<60}", "");
    println!(
        "Weather @ {:.4},{:.4} ({})",
        weather.lat, weather.lon, weather.timezone
    );
    println!(
        "  now: {:.1} K, feels like {:.1} K, {}% humidity, {}",
        weather.current.temp,
        weather.current.feels_like,
        weather.current.humidity,
        weather.current.weather.description
    );
    println!(
        "  {} hourly, {} daily, {} alerts",
        weather.hourly.len(),
        weather.daily.len(),
        weather.alerts.len()
    );
    for alert in weather.alerts.iter() {
        println!("  ! {} ({} - {})", alert.event, alert.start, alert.end);
    }
}

fn print_air_quality(sample: &AirQualitySample) {
    println!("{:-<60}", "");
    println!("Air quality @ {:.4},{:.4}: {} hourly samples", sample.lat, sample.lon, sample.len());
    if let Some(latest) = sample.len().checked_sub(1).and_then(|i| sample.reading(i)) {
        println!(
            "  latest: AQI {} PM2.5 {:.1} PM10 {:.1} O3 {:.1}",
            latest.aqi, latest.pm2_5, latest.pm10, latest.o3
        );
    }
}

fn print_page(page: &AssetPage) {
    println!("{:-<60}", "");
    println!(
        "{} ({} of {} valid)",
        page.kind.label(),
        page.valid_count(),
        page.assets.len()
    );
    println!(
        "{:<10} {:<12} {:>8} {:>8} {:>8} {:>8}",
        "Symbol", "Price", "Day%", "Week%", "Month%", "Year%"
    );
    for quote in page.assets.iter() {
        if !quote.valid {
            println!("{:<10} {:<12}", quote.display_symbol, "n/a");
            continue;
        }
        println!(
            "{:<10} {:<12.4} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
            quote.display_symbol,
            quote.price,
            quote.change_day,
            quote.change_week,
            quote.change_month,
            quote.change_year
        );
    }
}

fn print_report(report: &CycleReport) {
    println!("{:-<60}", "");
    if let Some(status) = &report.weather {
        print_status("weather", status);
    }
    if let Some(status) = &report.air_quality {
        print_status("air", status);
    }
    for page in &report.pages {
        match (&page.status, &page.batch) {
            (Some(status), _) => print_status(page.kind.label(), status),
            (None, Some(batch)) => println!(
                "{:<12} {}/{} ok, {} batches, {} timeouts",
                page.kind.label(),
                batch.succeeded,
                batch.launched,
                batch.batches,
                batch.timeouts
            ),
            (None, None) => {}
        }
    }
    if let Some(rate) = report.conversion_rate {
        println!("{:<12} {:.4}", "rate", rate);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let app = App::new("feedhub")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Weather, air quality and market data feeds")
        .arg(
            Arg::with_name("lat")
                .long("lat")
                .value_name("LAT")
                .help("Latitude for weather and air quality")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("lon")
                .long("lon")
                .value_name("LON")
                .help("Longitude for weather and air quality")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("owm-key")
                .long("owm-key")
                .value_name("KEY")
                .help("OpenWeatherMap API key (or FEEDHUB_OWM_API_KEY)")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("coingecko-key")
                .long("coingecko-key")
                .value_name("KEY")
                .help("CoinGecko demo API key (or FEEDHUB_COINGECKO_API_KEY)")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("lang")
                .long("lang")
                .value_name("LANG")
                .help("Language for weather descriptions")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("alerts")
                .long("alerts")
                .help("Include weather alerts")
                .takes_value(false)
                .global(true),
        )
        .arg(
            Arg::with_name("max-concurrency")
                .short('c')
                .long("max-concurrency")
                .value_name("N")
                .help("Maximum concurrent chart requests")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("json")
                .long("json")
                .help("Print records as JSON")
                .takes_value(false)
                .global(true),
        )
        .subcommand(SubCommand::with_name("weather").about("Fetch the One Call weather forecast"))
        .subcommand(SubCommand::with_name("air").about("Fetch the air quality history"))
        .subcommand(SubCommand::with_name("markets").about("Fetch crypto, indices, commodities and forex"))
        .subcommand(SubCommand::with_name("all").about("Fetch every source"));

    let matches = app.get_matches();
    let (command, sub_matches) = match matches.subcommand() {
        Some((name, sub)) => (name, sub),
        None => {
            info!("No command specified. Use --help for usage information.");
            return Ok(());
        }
    };

    let config = build_config(sub_matches)?;
    let json_output = sub_matches.is_present("json");
    let mut service = FeedService::new(config)?;

    match command {
        "weather" => {
            let status = service.fetch_weather().await;
            if json_output {
                println!("{}", serde_json::to_string_pretty(service.weather())?);
            } else {
                print_weather(service.weather());
                print_status("weather", &status);
            }
        }
        "air" => {
            let status = service.fetch_air_quality().await;
            if json_output {
                println!("{}", serde_json::to_string_pretty(service.air_quality())?);
            } else {
                print_air_quality(service.air_quality());
                print_status("air", &status);
            }
        }
        "markets" => {
            let report = service.fetch_financial().await;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&service.pages())?);
            } else {
                for page in service.pages() {
                    print_page(page);
                }
                print_report(&report);
            }
        }
        "all" => {
            let report = service.fetch_all().await;
            if json_output {
                let records = json!({
                    "weather": service.weather(),
                    "air_quality": service.air_quality(),
                    "pages": service.pages(),
                });
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_weather(service.weather());
                print_air_quality(service.air_quality());
                for page in service.pages() {
                    print_page(page);
                }
                print_report(&report);
            }
        }
        other => anyhow::bail!("Unknown command: {}", other),
    }

    Ok(())
}
