//! The service a connection starts with.

use definitions::{
    consts::DisconnectReason,
    packets::{Packet, ServiceAccept, ServiceRequest},
};
use tracing::info;

use super::{Dispatch, Service, ServiceContext};
use crate::errors::DisconnectError;

/// Waits for the client to request a service.
#[derive(Debug, Default)]
pub(crate) struct Initial;

impl Service for Initial {
    fn name(&self) -> &'static str {
        "initial"
    }

    fn handle_packet(
        &mut self,
        packet: Packet,
        context: &mut ServiceContext,
    ) -> Result<Dispatch, DisconnectError> {
        let service_name = match packet {
            Packet::ServiceRequest(ServiceRequest { service_name }) => service_name,
            other => return Ok(Dispatch::Unhandled(other)),
        };

        let factory = context.config().service(&service_name).ok_or_else(|| {
            DisconnectError::new(
                DisconnectReason::ServiceNotAvailable,
                format!("service {:?} is not available", service_name),
            )
        })?;

        info!(service = %service_name, "service accepted");

        context.send(ServiceAccept { service_name });

        Ok(Dispatch::SwitchTo(factory()))
    }
}
