//! Share planning - connect, pick a baseline, diff

use anyhow::{Context as AnyhowContext, Result};
use declarative::{reconcile, Collection, ReconcileError, ReconciliationPlan};
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::acl::{share_policy, AclEntry};
use crate::config::{Config, ShareConfig};
use crate::ontap::{RestClient, ShareAclGateway};
use crate::progress;
use crate::state::AclState;

/// Where a share's diff baseline came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineSource {
    /// The state file's record of the last cycle
    Recorded,
    /// Read from the cluster because nothing was recorded
    Remote,
}

/// One share ready to apply
pub struct SharePlan {
    pub id: String,
    pub desired: Collection<AclEntry>,
    pub baseline: Collection<AclEntry>,
    pub source: BaselineSource,
    pub plan: Result<ReconciliationPlan<AclEntry>, ReconcileError>,
    pub gateway: ShareAclGateway,
}

impl SharePlan {
    /// Number of operations planned, zero for an invalid desired ACL
    pub fn operations(&self) -> usize {
        self.plan.as_ref().map_or(0, ReconciliationPlan::len)
    }
}

/// A share that could not be planned
#[derive(Debug, Clone)]
pub struct PlanFailure {
    pub id: String,
    pub error: String,
}

/// Plans for every selected share
#[derive(Default)]
pub struct PlanSet {
    pub shares: Vec<SharePlan>,
    pub failures: Vec<PlanFailure>,
}

impl PlanSet {
    /// Total operations across all shares
    pub fn operations(&self) -> usize {
        self.shares.iter().map(SharePlan::operations).sum()
    }

    /// Shares whose desired ACL declares a key twice
    pub fn invalid(&self) -> usize {
        self.shares.iter().filter(|s| s.plan.is_err()).count()
    }

    /// Check if any share could not be planned
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty() || self.invalid() > 0
    }
}

/// REST client per connection name, or why it could not be built
pub type Clients = BTreeMap<String, Result<RestClient, String>>;

/// Build one REST client per connection the selected shares use
///
/// A profile that cannot produce settings (missing password variable) fails
/// only the shares that use it.
pub fn clients_for(config: &Config, shares: &[&ShareConfig]) -> Clients {
    let mut clients = BTreeMap::new();
    for share in shares {
        if clients.contains_key(&share.connection) {
            continue;
        }
        let client = config
            .connection(&share.connection)
            .and_then(|profile| profile.client_settings())
            .map(|settings| RestClient::new(&settings))
            .map_err(|e| format!("{e:#}"));
        clients.insert(share.connection.clone(), client);
    }
    clients
}

/// Bind a gateway for one share
pub fn connect(clients: &Clients, share: &ShareConfig) -> Result<ShareAclGateway> {
    let client = match clients.get(&share.connection) {
        Some(Ok(client)) => client.clone(),
        Some(Err(e)) => anyhow::bail!("Connection '{}': {e}", share.connection),
        None => anyhow::bail!("Unknown connection '{}'", share.connection),
    };
    ShareAclGateway::connect(client, &share.svm, &share.name)
        .with_context(|| format!("Could not resolve SVM '{}'", share.svm))
}

/// Plan every share, reading baselines in parallel
pub fn plan_shares(
    config: &Config,
    shares: &[&ShareConfig],
    state: &AclState,
    jobs: usize,
    quiet: bool,
) -> Result<PlanSet> {
    let clients = clients_for(config, shares);
    let pool = super::thread_pool(jobs)?;
    let pb = progress::bar(shares.len() as u64, "Reading", quiet);

    let results: Vec<Result<SharePlan, PlanFailure>> = pool.install(|| {
        shares
            .par_iter()
            .map(|share| {
                pb.set_message(share.id());
                let result = plan_share(&clients, share, state).map_err(|e| PlanFailure {
                    id: share.id(),
                    error: format!("{e:#}"),
                });
                pb.inc(1);
                result
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut set = PlanSet::default();
    for result in results {
        match result {
            Ok(plan) => set.shares.push(plan),
            Err(failure) => {
                log::warn!("{}: {}", failure.id, failure.error);
                set.failures.push(failure);
            }
        }
    }
    Ok(set)
}

fn plan_share(clients: &Clients, share: &ShareConfig, state: &AclState) -> Result<SharePlan> {
    let id = share.id();
    let gateway = connect(clients, share)?;

    let (baseline, source) = match state.applied(&id) {
        Some(recorded) => (recorded, BaselineSource::Recorded),
        None => {
            log::info!("{id}: no recorded state, reading ACL from the cluster");
            let remote = gateway
                .fetch()
                .with_context(|| format!("Could not read ACL of {id}"))?;
            (remote, BaselineSource::Remote)
        }
    };

    let desired = share.desired();
    let plan = reconcile(&desired, &baseline, &share_policy());
    if let Ok(plan) = &plan {
        log::debug!("{id}: {} operations planned", plan.len());
    }

    Ok(SharePlan {
        id,
        desired,
        baseline,
        source,
        plan,
        gateway,
    })
}
