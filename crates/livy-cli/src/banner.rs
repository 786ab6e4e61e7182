use livy_config::AppConfig;

/// Print the startup banner with a config summary.
pub fn print_banner(config: &AppConfig, schema_version: u32) {
    let version = env!("CARGO_PKG_VERSION");

    let store = match &config.store {
        livy_config::StoreConfig::Postgres(db) => {
            format!("postgres {}:{}/{}", db.host, db.port, db.database)
        }
        livy_config::StoreConfig::Sqlite { path } => format!("sqlite {}", path.display()),
    };
    let url = format!("http://{}", config.api.bind_addr());

    let width = 62;
    let title = format!("Livy v{version}");
    let top = format!("╭─── {title} {}╮", "─".repeat(width - 2 - title.len() - 5));
    let bottom = format!("╰{}╯", "─".repeat(width - 2));
    let inner = width - 4;
    let row = |text: &str| format!("│ {text:<inner$} │");

    println!("{top}");
    println!("{}", row(""));
    println!("{}", row(&format!("API       {url}")));
    println!("{}", row(&format!("Store     {store}")));
    println!("{}", row(&format!("Schema    version {schema_version}")));
    println!("{}", row(""));
    println!("{}", row("Press Ctrl+C to stop"));
    println!("{bottom}");
}
