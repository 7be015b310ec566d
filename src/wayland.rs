// Wayland integration module
// Enumerates outputs using smithay-client-toolkit

use crate::display::DisplayTarget;
use crate::error::{Error, Result};
use crate::geometry::Size;
use log::{debug, info};
use smithay_client_toolkit::{
    delegate_output, delegate_registry,
    output::{OutputHandler, OutputInfo, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
};
use wayland_client::{globals::registry_queue_init, protocol::wl_output, Connection, QueueHandle};

delegate_output!(OutputProbe);
delegate_registry!(OutputProbe);

/// Minimal client state: only the registry and output globals are bound
struct OutputProbe {
    registry_state: RegistryState,
    output_state: OutputState,
}

/// Connect to the compositor and read every output's geometry
pub fn list_outputs() -> Result<Vec<DisplayTarget>> {
    info!("Connecting to Wayland display");

    let conn = Connection::connect_to_env()
        .map_err(|e| Error::DisplayQuery(format!("Failed to connect to Wayland display: {e}")))?;

    let (globals, mut event_queue) = registry_queue_init(&conn)
        .map_err(|e| Error::DisplayQuery(format!("Failed to initialize registry: {e}")))?;
    let qh = event_queue.handle();

    let mut probe = OutputProbe {
        registry_state: RegistryState::new(&globals),
        output_state: OutputState::new(&globals, &qh),
    };

    // First roundtrip binds the outputs, the second delivers their info
    for _ in 0..2 {
        event_queue
            .roundtrip(&mut probe)
            .map_err(|e| Error::DisplayQuery(format!("Wayland roundtrip failed: {e}")))?;
    }

    let targets: Vec<DisplayTarget> = probe
        .output_state
        .outputs()
        .filter_map(|output| probe.output_state.info(&output))
        .enumerate()
        .filter_map(|(index, info)| target_from_info(index, &info))
        .collect();

    info!("Found {} Wayland output(s)", targets.len());
    Ok(targets)
}

/// Convert compositor output info into a display target
fn target_from_info(index: usize, info: &OutputInfo) -> Option<DisplayTarget> {
    let id = info
        .name
        .clone()
        .unwrap_or_else(|| format!("wayland-{}", info.id));

    let mode = info
        .modes
        .iter()
        .find(|m| m.current)
        .or_else(|| info.modes.first())
        .map(|m| Size::new(m.dimensions.0.max(0) as u32, m.dimensions.1.max(0) as u32));

    let logical = info
        .logical_size
        .map(|(w, h)| Size::new(w.max(0) as u32, h.max(0) as u32));

    let Some((logical, scale)) = scale_from(logical, mode, info.scale_factor) else {
        debug!("Skipping output {id} without geometry");
        return None;
    };
    let target = DisplayTarget::new(id, logical, scale, index);

    debug!(
        "Output {}: logical {} @ {:.2} -> {}",
        target.id,
        target.logical_size,
        target.scale_factor,
        target.pixel_size()
    );
    Some(target)
}

/// Logical size and scale factor from xdg-output size, current mode and wl_output scale
///
/// With both sizes known the scale is mode over logical, which covers
/// fractional scaling. The mode is in buffer orientation while the logical
/// size follows the output transform, so the long sides are compared.
fn scale_from(logical: Option<Size>, mode: Option<Size>, integer_scale: i32) -> Option<(Size, f64)> {
    let logical = logical.filter(|s| !s.is_empty());
    let mode = mode.filter(|s| !s.is_empty());
    let integer_scale = integer_scale.max(1) as f64;

    match (logical, mode) {
        (Some(logical), Some(mode)) => {
            let long_mode = mode.width.max(mode.height) as f64;
            let long_logical = logical.width.max(logical.height) as f64;
            Some((logical, long_mode / long_logical))
        }
        (Some(logical), None) => Some((logical, integer_scale)),
        (None, Some(mode)) => {
            let logical = Size::new(
                (mode.width as f64 / integer_scale).round() as u32,
                (mode.height as f64 / integer_scale).round() as u32,
            );
            Some((logical, integer_scale))
        }
        (None, None) => None,
    }
}

impl OutputHandler for OutputProbe {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("New output detected");
    }

    fn update_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("Output updated");
    }

    fn output_destroyed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("Output destroyed");
    }
}

impl ProvidesRegistryState for OutputProbe {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![OutputState];
}
