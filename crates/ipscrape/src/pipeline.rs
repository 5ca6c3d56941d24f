use crate::output::{complete, write_lines};
use crate::{AddressExpander, Config, Error, Normalizer, ProgressSink};
use asn_origin::OriginLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Distinct IPv4 routes returned by the registry
    pub routes: usize,
    /// Blocks left after normalization
    pub blocks: usize,
    pub addresses: u64,
}

/// Runs the resolve, normalize and expand stages in order, each one
/// finishing, with its output written to disk, before the next starts.
pub struct Pipeline<'a> {
    config: &'a Config,
    lookup: &'a dyn OriginLookup,
    normalizer: &'a dyn Normalizer,
    progress: &'a dyn ProgressSink,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        lookup: &'a dyn OriginLookup,
        normalizer: &'a dyn Normalizer,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            config,
            lookup,
            normalizer,
            progress,
        }
    }

    pub async fn run(&self) -> Result<PipelineSummary, Error> {
        let paths = &self.config.paths;
        tokio::fs::create_dir_all(&paths.storage_dir)
            .await
            .map_err(|source| Error::Write {
                path: paths.storage_dir.clone(),
                source,
            })?;

        let routes = crate::resolve::resolve(
            self.lookup,
            self.config.asn,
            self.config.seed_ip,
            &paths.dirty_cidr,
            self.progress,
        )
        .await?;
        tracing::info!("{} originates {} IPv4 routes", self.config.asn, routes.len());

        let blocks = self.normalizer.normalize(&routes, self.progress).await?;
        self.progress.report(
            &format!("Writing cleaned cidr list to file {}", paths.cidr.display()),
            false,
        );
        write_lines(&paths.cidr, blocks.iter(), self.progress)
            .await
            .map_err(|source| Error::Write {
                path: paths.cidr.clone(),
                source,
            })?;
        complete(self.progress);
        tracing::info!("normalized to {} blocks", blocks.len());

        self.progress.report("Generating ip from cidr list", false);
        let expansion = AddressExpander::new()
            .with_max_addresses(self.config.max_addresses)
            .expand(blocks.as_slice())?;
        complete(self.progress);

        self.progress.report(
            &format!("Writing sorted ip to file {}", paths.ip.display()),
            false,
        );
        write_lines(&paths.ip, expansion.addresses(), self.progress)
            .await
            .map_err(|source| Error::Write {
                path: paths.ip.clone(),
                source,
            })?;
        complete(self.progress);

        Ok(PipelineSummary {
            routes: routes.len(),
            blocks: blocks.len(),
            addresses: expansion.address_count(),
        })
    }
}
