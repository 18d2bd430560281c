use rand::Rng;
use tracing::warn;

use crate::error::BridgeError;
use crate::models::ForwardMapping;
use crate::session::Session;

pub const FORWARD_PORT_MIN: u16 = 11111;
/// Exclusive upper bound of the local-port draw.
pub const FORWARD_PORT_MAX: u16 = 20000;

/// Device-side endpoint of a forward. Some descriptors must embed the chosen
/// local port (abstract socket names keyed by it), so the spec can be a
/// function of the local port, evaluated at bind time.
pub enum DevicePortSpec {
    Literal(String),
    FromLocal(Box<dyn Fn(u16) -> String + Send>),
}

impl DevicePortSpec {
    pub fn from_local(f: impl Fn(u16) -> String + Send + 'static) -> Self {
        DevicePortSpec::FromLocal(Box::new(f))
    }

    fn resolve(&self, local_port: u16) -> String {
        match self {
            DevicePortSpec::Literal(value) => value.clone(),
            DevicePortSpec::FromLocal(f) => f(local_port),
        }
    }
}

impl From<&str> for DevicePortSpec {
    fn from(value: &str) -> Self {
        DevicePortSpec::Literal(value.to_string())
    }
}

impl From<String> for DevicePortSpec {
    fn from(value: String) -> Self {
        DevicePortSpec::Literal(value)
    }
}

impl Session {
    /// Pseudo-random local forward port. Availability is not checked here;
    /// `forward --no-rebind` rejects a taken port at bind time.
    pub fn available_forward_local(&self) -> u16 {
        rand::thread_rng().gen_range(FORWARD_PORT_MIN..FORWARD_PORT_MAX)
    }

    /// Draw a local port, resolve the device-side descriptor and bind the
    /// forward. Collisions are independent low-probability events, so the
    /// whole draw-and-bind sequence retries a fixed number of times and the
    /// last error propagates.
    pub fn setup_forward(
        &self,
        device_port: impl Into<DevicePortSpec>,
        no_rebind: bool,
    ) -> Result<(u16, String), BridgeError> {
        let spec = device_port.into();
        let mut last_err = None;
        for attempt in 1..=self.config.forward_bind_attempts {
            let local_port = self.available_forward_local();
            let device_port = spec.resolve(local_port);
            match self.forward(&format!("tcp:{local_port}"), &device_port, no_rebind) {
                Ok(()) => return Ok((local_port, device_port)),
                Err(err) => {
                    warn!(
                        trace_id = %self.trace_id,
                        attempt,
                        local_port,
                        error = %err,
                        "forward bind failed, redrawing local port"
                    );
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            BridgeError::config("forward bind attempts must be at least 1", &self.trace_id)
        }))
    }

    pub fn forward(&self, local: &str, remote: &str, no_rebind: bool) -> Result<(), BridgeError> {
        self.device()?
            .forward(local, remote, no_rebind)
            .map_err(|err| self.command_error(err))
    }

    /// Remove one mapping, or all mappings for this session when `local` is
    /// `None`. The underlying error is not swallowed here; the registry's
    /// exit sweep is the one place that tolerates it.
    pub fn remove_forward(&self, local: Option<&str>) -> Result<(), BridgeError> {
        let device = self.device()?;
        match local {
            Some(local) => device.kill_forward(local),
            None => device.kill_forward_all(),
        }
        .map_err(|err| self.command_error(err))
    }

    /// Currently registered mappings, one triple per forward. Finite;
    /// restartable by calling again.
    pub fn list_forwards(
        &self,
    ) -> Result<impl Iterator<Item = ForwardMapping>, BridgeError> {
        let serial = self.serial()?;
        let pairs = self
            .device()?
            .list_forward()
            .map_err(|err| self.command_error(err))?;
        Ok(pairs.into_iter().map(move |(local, remote)| ForwardMapping {
            serial: serial.clone(),
            local,
            remote,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_spec_ignores_local_port() {
        let spec = DevicePortSpec::from("tcp:5001");
        assert_eq!(spec.resolve(12345), "tcp:5001");
    }

    #[test]
    fn callable_spec_embeds_local_port() {
        let spec = DevicePortSpec::from_local(|port| format!("localabstract:minitouch_{port}"));
        assert_eq!(spec.resolve(13000), "localabstract:minitouch_13000");
    }
}
