pub fn run(json: bool, playerctl: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let bus = super::media_bus(playerctl);
    let players = runtime.block_on(bus.list_players())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&players)?);
        return Ok(());
    }
    if players.is_empty() {
        println!("no players");
    }
    for p in &players {
        println!("{}\t{:?}", p.player, p.status);
    }
    Ok(())
}
