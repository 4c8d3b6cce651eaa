//! Shared codec state.
//!
//! A [`CodecContext`] owns everything readers and writers share across
//! messages: the running configuration, the object-model registry and the
//! marker and strategy tables. Readers and writers hold an `Arc` to one
//! context; a process-wide default is available through
//! [`CodecContext::global`].

use crate::config::CodecConfig;
use crate::message::ObjectEncoding;
use crate::read_table::ReaderTable;
use crate::write_table::WriterTable;
use amfwire_core::Registry;
use arc_swap::ArcSwap;
use std::sync::{Arc, OnceLock};
use tracing::info;

static GLOBAL: OnceLock<ArcSwap<CodecContext>> = OnceLock::new();

#[derive(Debug)]
pub struct CodecContext {
    settings: ArcSwap<CodecConfig>,
    registry: Arc<Registry>,
    amf0_readers: ReaderTable,
    amf3_readers: ReaderTable,
    amf0_writers: WriterTable,
    amf3_writers: WriterTable,
}

impl Default for CodecContext {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

impl CodecContext {
    pub fn new(config: CodecConfig) -> Self {
        Self::with_registry(config, Arc::new(Registry::new()))
    }

    pub fn with_registry(config: CodecConfig, registry: Arc<Registry>) -> Self {
        Self {
            settings: ArcSwap::from_pointee(config),
            registry,
            amf0_readers: ReaderTable::amf0(),
            amf3_readers: ReaderTable::amf3(),
            amf0_writers: WriterTable::amf0(),
            amf3_writers: WriterTable::amf3(),
        }
    }

    /// Builds a context and installs it as the process-wide default.
    pub fn init(config: CodecConfig) -> Arc<Self> {
        let context = Arc::new(Self::new(config));
        Self::install_global(context.clone());
        info!("codec context initialised");
        context
    }

    /// The process-wide default context, created with default settings on
    /// first use.
    pub fn global() -> Arc<Self> {
        GLOBAL
            .get_or_init(|| ArcSwap::from_pointee(Self::default()))
            .load_full()
    }

    pub fn install_global(context: Arc<Self>) {
        GLOBAL
            .get_or_init(|| ArcSwap::new(context.clone()))
            .store(context);
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Arc<CodecConfig> {
        self.settings.load_full()
    }

    /// Replaces the settings; readers and writers created afterwards see
    /// the new values.
    pub fn update_settings(&self, config: CodecConfig) {
        self.settings.store(Arc::new(config));
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn readers(&self, encoding: ObjectEncoding) -> &ReaderTable {
        match encoding {
            ObjectEncoding::Amf0 => &self.amf0_readers,
            ObjectEncoding::Amf3 => &self.amf3_readers,
        }
    }

    pub fn writers(&self, encoding: ObjectEncoding) -> &WriterTable {
        match encoding {
            ObjectEncoding::Amf0 => &self.amf0_writers,
            ObjectEncoding::Amf3 => &self.amf3_writers,
        }
    }

    /// Drops every cache built up while encoding: class definitions, proxy
    /// selections and lazily registered writer strategies.
    pub fn shutdown(&self) {
        self.registry.shutdown();
        self.amf0_writers.clear_fallbacks();
        self.amf3_writers.clear_fallbacks();
        info!("codec context caches cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimezoneCompensation;
    use amfwire_core::{reflect_type, Value};

    #[derive(Debug, Default)]
    struct Ticket {
        seat: i32,
    }

    reflect_type!(Ticket, "event.Ticket", [seat: i32]);

    #[test]
    fn test_settings_update() {
        let context = CodecContext::default();
        assert_eq!(
            context.settings().dates.timezone_compensation,
            TimezoneCompensation::None
        );

        let mut config = CodecConfig::default();
        config.dates.timezone_compensation = TimezoneCompensation::Server;
        context.update_settings(config);
        assert_eq!(
            context.settings().dates.timezone_compensation,
            TimezoneCompensation::Server
        );
    }

    #[test]
    fn test_tables_by_encoding() {
        let context = CodecContext::default();
        assert_eq!(context.writers(ObjectEncoding::Amf0).encoding(), ObjectEncoding::Amf0);
        assert_eq!(context.writers(ObjectEncoding::Amf3).encoding(), ObjectEncoding::Amf3);
        assert!(context.readers(ObjectEncoding::Amf3).contains(0x10));
        assert!(!context.readers(ObjectEncoding::Amf0).contains(0x12));
    }

    #[test]
    fn test_shutdown_clears_caches() {
        let context = CodecContext::default();
        let ticket = Value::typed(Ticket { seat: 4 });
        context.writers(ObjectEncoding::Amf3).resolve(&ticket).unwrap();
        let node = ticket.as_typed().unwrap().clone();
        context.registry().class_definition(&*node.read()).unwrap();

        assert_eq!(context.writers(ObjectEncoding::Amf3).fallback_count(), 1);
        assert_eq!(context.registry().cached_definitions(), 1);

        context.shutdown();
        assert_eq!(context.writers(ObjectEncoding::Amf3).fallback_count(), 0);
        assert_eq!(context.registry().cached_definitions(), 0);
    }

    #[test]
    fn test_global_is_shared() {
        let a = CodecContext::global();
        let b = CodecContext::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
