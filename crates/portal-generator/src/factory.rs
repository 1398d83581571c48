use crate::{GeneratorError, IdGenerator, InMemorySequence, SequenceGenerator};
use jiff::Timestamp;
use portal_core::SequenceSource;
use portal_snowflake::{Snowflake, SnowflakeSettings, DEFAULT_EPOCH};
use std::sync::Arc;

/// Selects the id strategy once, at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorSettings {
    /// Node-local time-ordered ids. Every node needs a distinct `node_id`
    /// and all nodes must share `epoch`.
    Snowflake { node_id: u16, epoch: Timestamp },
    /// Ids drawn from an external counter.
    Sequence,
}

impl GeneratorSettings {
    pub fn snowflake(node_id: u16) -> Self {
        GeneratorSettings::Snowflake {
            node_id,
            epoch: DEFAULT_EPOCH,
        }
    }
}

/// Builds the configured generator.
///
/// For [`GeneratorSettings::Sequence`] the given `source` is used, or a
/// process-local [`InMemorySequence`] when none is supplied.
pub fn build_generator(
    settings: &GeneratorSettings,
    source: Option<Arc<dyn SequenceSource>>,
) -> Result<Arc<dyn IdGenerator>, GeneratorError> {
    match settings {
        GeneratorSettings::Snowflake { node_id, epoch } => {
            let settings = SnowflakeSettings::builder()
                .node_id(*node_id)
                .start_epoch(*epoch)
                .build();
            Ok(Arc::new(Snowflake::new(settings)?))
        }
        GeneratorSettings::Sequence => {
            let source = source.unwrap_or_else(|| Arc::new(InMemorySequence::new()));
            Ok(Arc::new(SequenceGenerator::new(source)))
        }
    }
}
