//! Static assignment of producers to consumers.

use crate::error::{ProducerError, ProducerResult};

/// Fixed list of consumer addresses, assigned to producers round-robin.
///
/// There is no rebalancing or failover: a producer keeps its consumer for
/// its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerRegistry {
    addresses: Vec<String>,
}

impl ConsumerRegistry {
    /// Registry over an explicit address list.
    pub fn new(addresses: Vec<String>) -> ProducerResult<Self> {
        let addresses: Vec<String> = addresses
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if addresses.is_empty() {
            return Err(ProducerError::config("at least one consumer address is required"));
        }
        Ok(Self { addresses })
    }

    /// Registry of `count` consumers on consecutive ports of one host.
    pub fn from_base_port(host: &str, base_port: u16, count: usize) -> ProducerResult<Self> {
        let addresses = (0..count)
            .map(|i| {
                u16::try_from(i)
                    .ok()
                    .and_then(|offset| base_port.checked_add(offset))
                    .map(|port| format!("{}:{}", host, port))
                    .ok_or_else(|| ProducerError::config("consumer port range overflows"))
            })
            .collect::<ProducerResult<Vec<_>>>()?;
        Self::new(addresses)
    }

    /// Consumer address for a producer.
    pub fn assign(&self, producer_index: usize) -> &str {
        &self.addresses[producer_index % self.addresses.len()]
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}
