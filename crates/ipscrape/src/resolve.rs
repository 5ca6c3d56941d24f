use crate::output::{complete, write_lines};
use crate::{Error, ProgressSink};
use asn_origin::{Asn, LookupError, OriginLookup};
use cidr_set::parse_ipv4_cidr;
use indexmap::IndexSet;
use std::net::Ipv4Addr;
use std::path::Path;

/// Fetches the IPv4 routes originated by `asn`.
///
/// Every usable route is recorded, in the order received and including
/// repeats, to `dirty_path`. The returned list has repeats removed but
/// otherwise keeps that order. IPv6 routes are skipped silently; any
/// other entry that doesn't parse as an IPv4 CIDR fails the lookup
/// before anything is written.
pub async fn resolve(
    lookup: &dyn OriginLookup,
    asn: Asn,
    seed_ip: Ipv4Addr,
    dirty_path: &Path,
    progress: &dyn ProgressSink,
) -> Result<Vec<String>, Error> {
    progress.report(&format!("Grabbing cidr list from asn ({asn})"), false);

    let routes = lookup.origin_routes(asn, seed_ip).await?;
    tracing::debug!("{asn} has {} route objects", routes.len());

    let mut fetched = vec![];
    for route in &routes {
        let cidr = route.cidr.trim();
        if cidr.contains(':') {
            continue;
        }
        parse_ipv4_cidr(cidr).map_err(|source| LookupError::Malformed {
            route: cidr.to_string(),
            source,
        })?;
        fetched.push(cidr.to_string());
    }

    write_lines(dirty_path, fetched.iter(), progress)
        .await
        .map_err(|source| Error::Write {
            path: dirty_path.to_path_buf(),
            source,
        })?;
    complete(progress);

    let unique: IndexSet<String> = fetched.into_iter().collect();
    Ok(unique.into_iter().collect())
}
