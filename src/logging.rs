use tracing_subscriber::fmt;

pub fn init(verbose: bool) {
    if !verbose {
        return;
    }
    let _ = fmt()
        .with_target(false)
        .with_level(true)
        .compact()
        .try_init();
}
