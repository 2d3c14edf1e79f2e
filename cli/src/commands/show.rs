use anyhow::bail;
use reconr_common::ports::DocumentStore;
use reconr_common::target::Target;
use reconr_core::store::JsonFileStore;

use crate::commands::ConfigArgs;
use crate::terminal::report;

pub fn show(target: Target, args: ConfigArgs) -> anyhow::Result<()> {
    let cfg = args.load()?;
    let store = JsonFileStore::new(&cfg.scan.output_dir);
    let path = store.path_for(target.as_str());

    let Some(document) = store.load(target.as_str())? else {
        bail!("nothing stored for {target} in {}", store.dir().display());
    };

    report::document(&document, &path, None);
    Ok(())
}
