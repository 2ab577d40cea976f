fn main() -> anyhow::Result<()> {
    achievement_watchdog_lib::run()
}
