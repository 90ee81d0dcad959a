//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                    |
//! |-------------|--------------------|--------------------------------|
//! | `gpio`      | ActuatorBus        | embedded-hal relay pins, servo |
//! | `log_sink`  | EventSink          | `log` facade                   |
//! | `setpoints` | SetpointsProvider  | Shared, validated store        |
//! | `sim`       | SensorBus          | In-process greenhouse model    |
//! |             | ActuatorBus        |                                |
//! | `time`      | Clock              | Host monotonic + wall clock    |

pub mod gpio;
pub mod log_sink;
pub mod setpoints;
pub mod sim;
pub mod time;
