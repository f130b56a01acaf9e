//! Catalog of services plus the derived matching state.
//!
//! The live service list, compiled regexes, and the prefilter automaton are
//! published together as an immutable snapshot behind `ArcSwap`. Mutations
//! clone the service list, edit it, rebuild the derived state, and swap the
//! snapshot in; a classification batch loads the snapshot once at batch
//! start and never observes partial edits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aho_corasick::AhoCorasick;
use arc_swap::ArcSwap;
use im::Vector;
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::config::EngineConfig;
use crate::decoder::Service;

/// Immutable view of the catalog used for one classification batch.
pub struct CatalogSnapshot {
    services: Vector<Service>,
    /// Compiled patterns keyed by decoder id. A decoder whose stored pattern
    /// no longer compiles is absent here and treated as a non-match.
    regexes: FxHashMap<u64, Arc<Regex>>,
    /// Prefilter keywords of enabled services, one automaton pattern per
    /// keyword.
    prefilters: AhoCorasick,
    /// Automaton pattern index -> position in `services`.
    prefilter_index: Vec<usize>,
}

impl CatalogSnapshot {
    fn build(services: Vector<Service>) -> Self {
        let mut regexes = FxHashMap::default();
        for service in &services {
            for decoder in service.decoders() {
                match Regex::new(&decoder.pattern) {
                    Ok(regex) => {
                        regexes.insert(decoder.id, Arc::new(regex));
                    }
                    Err(err) => {
                        // Corrupted persisted state must not take the batch
                        // down; the decoder just never matches.
                        tracing::warn!(
                            decoder = %decoder.name,
                            %err,
                            "stored pattern failed to compile; decoder will not match"
                        );
                    }
                }
            }
        }

        let mut keywords = Vec::new();
        let mut prefilter_index = Vec::new();
        for (pos, service) in services.iter().enumerate() {
            if !service.enabled() {
                continue;
            }
            if service.prefilter().is_empty() {
                // An empty keyword would shortlist every line. Construction
                // rejects it, but a persisted catalog can still carry one.
                tracing::warn!(
                    service = %service.name,
                    "empty prefilter keyword; service will not match"
                );
                continue;
            }
            keywords.push(service.prefilter().to_string());
            prefilter_index.push(pos);
        }
        let prefilters = AhoCorasick::new(&keywords).unwrap();

        Self {
            services,
            regexes,
            prefilters,
            prefilter_index,
        }
    }

    /// First enabled service (in list order) whose prefilter keyword occurs
    /// in the line.
    pub(crate) fn candidate_service(&self, line: &str) -> Option<&Service> {
        let mut best: Option<usize> = None;
        for mat in self.prefilters.find_overlapping_iter(line) {
            let pos = self.prefilter_index[mat.pattern().as_usize()];
            if pos == 0 {
                return self.services.get(0);
            }
            best = Some(best.map_or(pos, |b| b.min(pos)));
        }
        best.and_then(|pos| self.services.get(pos))
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.iter()
    }

    pub fn regex_for(&self, decoder_id: u64) -> Option<&Regex> {
        self.regexes.get(&decoder_id).map(Arc::as_ref)
    }
}

/// Owner of the service list and the id allocator.
///
/// Ids are scoped to the catalog instance, not a module-level counter, so
/// two catalogs never contend or collide.
pub struct DecoderCatalog {
    snapshot: ArcSwap<CatalogSnapshot>,
    next_id: AtomicU64,
    config: EngineConfig,
}

impl DecoderCatalog {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(CatalogSnapshot::build(Vector::new())),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Build a catalog from a persisted service list, e.g. deserialized from
    /// whatever storage the surrounding system uses.
    pub fn from_services(services: Vec<Service>) -> Self {
        let max_id = services
            .iter()
            .flat_map(|s| {
                std::iter::once(s.id).chain(s.decoders().iter().map(|d| d.id))
            })
            .max()
            .unwrap_or(0);
        Self {
            snapshot: ArcSwap::from_pointee(CatalogSnapshot::build(services.into_iter().collect())),
            next_id: AtomicU64::new(max_id + 1),
            config: EngineConfig::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Allocate an id scoped to this catalog.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// The snapshot a batch should classify against.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot.load_full()
    }

    pub fn add_service(&self, service: Service) {
        tracing::debug!(service = %service.name, id = service.id, "adding service");
        self.mutate(|services| services.push_back(service));
    }

    pub fn remove_service(&self, service_id: u64) -> bool {
        let mut removed = false;
        self.mutate(|services| {
            if let Some(pos) = services.iter().position(|s| s.id == service_id) {
                services.remove(pos);
                removed = true;
            }
        });
        if removed {
            tracing::debug!(id = service_id, "removed service");
        }
        removed
    }

    /// Apply an edit to one service and publish a new snapshot. Returns
    /// false if the service does not exist.
    pub fn update_service<F>(&self, service_id: u64, edit: F) -> bool
    where
        F: FnOnce(&mut Service),
    {
        let mut found = false;
        self.mutate(|services| {
            if let Some(pos) = services.iter().position(|s| s.id == service_id) {
                let mut service = services[pos].clone();
                edit(&mut service);
                services.set(pos, service);
                found = true;
            }
        });
        found
    }

    /// Current service list, cloned out of the live snapshot.
    pub fn services(&self) -> Vec<Service> {
        self.snapshot.load().services.iter().cloned().collect()
    }

    fn mutate(&self, f: impl FnOnce(&mut Vector<Service>)) {
        let current = self.snapshot.load();
        let mut services = current.services.clone();
        f(&mut services);
        self.snapshot.store(Arc::new(CatalogSnapshot::build(services)));
    }
}

impl Default for DecoderCatalog {
    fn default() -> Self {
        Self::new()
    }
}
