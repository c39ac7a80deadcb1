use crate::cmd::{PluginArgs, PluginConfig};
use crate::config::LayeredArgs;
use crate::error::MayavolError;
use crate::volume::VolumePlugin;
use tracing::{debug, info};

pub async fn serve(args: LayeredArgs<PluginArgs>) -> Result<(), MayavolError> {
    let config: PluginConfig = args.load()?;
    config.logger.init()?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting mayavol");
    debug!("plugin config: {:#?}", config);

    VolumePlugin::new(config).run().await?;
    info!("volume plugin exited");
    Ok(())
}
