//! # Static GPD lookup tables
//!
//! Default commands and clusters of the GP device types, used when a GPD
//! does not list them in its application information.

use psila_gp_data::cluster_library::cluster;
use psila_gp_data::green_power::{device_id, gpd_command};

/// Cluster and side, `true` for the server side
pub type ClusterSide = (u16, bool);

const SWITCH_CLUSTERS: &[ClusterSide] = &[(cluster::ON_OFF, true)];
const LEVEL_SWITCH_CLUSTERS: &[ClusterSide] = &[(cluster::LEVEL_CONTROL, true), (cluster::ON_OFF, true)];
const COLOR_DIMMER_CLUSTERS: &[ClusterSide] = &[(cluster::COLOR_CONTROL, true)];
const DOOR_LOCK_CLUSTERS: &[ClusterSide] = &[(cluster::DOOR_LOCK, true)];
const LIGHT_SENSOR_CLUSTERS: &[ClusterSide] = &[(cluster::ILLUMINANCE_MEASUREMENT, false)];
const OCCUPANCY_SENSOR_CLUSTERS: &[ClusterSide] = &[(cluster::OCCUPANCY_SENSING, false)];
const TEMPERATURE_SENSOR_CLUSTERS: &[ClusterSide] = &[(cluster::TEMPERATURE_MEASUREMENT, false)];
const PRESSURE_SENSOR_CLUSTERS: &[ClusterSide] = &[(cluster::PRESSURE_MEASUREMENT, false)];
const FLOW_SENSOR_CLUSTERS: &[ClusterSide] = &[(cluster::FLOW_MEASUREMENT, false)];
const ENVIRONMENT_SENSOR_CLUSTERS: &[ClusterSide] = &[
    (cluster::TEMPERATURE_MEASUREMENT, false),
    (cluster::RELATIVE_HUMIDITY_MEASUREMENT, false),
];

/// Commands of a device type
pub fn device_commands(device: u8) -> &'static [u8] {
    use gpd_command::*;
    match device {
        device_id::SIMPLE_GENERIC_ONE_STATE_SWITCH => &[PRESS_1_OF_1, RELEASE_1_OF_1],
        device_id::SIMPLE_GENERIC_TWO_STATE_SWITCH => {
            &[PRESS_1_OF_2, RELEASE_1_OF_2, PRESS_2_OF_2, RELEASE_2_OF_2]
        }
        device_id::ON_OFF_SWITCH => &[OFF, ON, TOGGLE],
        device_id::LEVEL_CONTROL_SWITCH => &[
            MOVE_UP,
            MOVE_DOWN,
            STEP_UP,
            STEP_DOWN,
            LEVEL_CONTROL_STOP,
            MOVE_UP_WITH_ON_OFF,
            MOVE_DOWN_WITH_ON_OFF,
            STEP_UP_WITH_ON_OFF,
            STEP_DOWN_WITH_ON_OFF,
        ],
        device_id::SIMPLE_SENSOR
        | device_id::LIGHT_SENSOR
        | device_id::OCCUPANCY_SENSOR
        | device_id::TEMPERATURE_SENSOR
        | device_id::PRESSURE_SENSOR
        | device_id::FLOW_SENSOR
        | device_id::ENVIRONMENT_SENSOR => &[ANY_SENSOR_COMMAND],
        device_id::ADVANCED_GENERIC_ONE_STATE_SWITCH => {
            &[PRESS_1_OF_1, RELEASE_1_OF_1, SHORT_PRESS_1_OF_1]
        }
        device_id::ADVANCED_GENERIC_TWO_STATE_SWITCH => &[
            PRESS_1_OF_2,
            RELEASE_1_OF_2,
            PRESS_2_OF_2,
            RELEASE_2_OF_2,
            SHORT_PRESS_1_OF_2,
            SHORT_PRESS_2_OF_2,
        ],
        device_id::GENERIC_SWITCH => &[GENERIC_SWITCH_PRESS, GENERIC_SWITCH_RELEASE],
        device_id::COLOR_DIMMER_SWITCH => &[
            MOVE_HUE_STOP,
            MOVE_HUE_UP,
            MOVE_HUE_DOWN,
            STEP_HUE_UP,
            STEP_HUE_DOWN,
            MOVE_SATURATION_STOP,
            MOVE_SATURATION_UP,
            MOVE_SATURATION_DOWN,
            STEP_SATURATION_UP,
            STEP_SATURATION_DOWN,
            MOVE_COLOR,
            STEP_COLOR,
        ],
        device_id::DOOR_LOCK_CONTROLLER => &[LOCK_DOOR, UNLOCK_DOOR],
        _ => &[],
    }
}

/// Sink side clusters of a device type
pub fn device_clusters(device: u8) -> &'static [ClusterSide] {
    match device {
        device_id::SIMPLE_GENERIC_ONE_STATE_SWITCH
        | device_id::SIMPLE_GENERIC_TWO_STATE_SWITCH
        | device_id::ON_OFF_SWITCH
        | device_id::ADVANCED_GENERIC_ONE_STATE_SWITCH
        | device_id::ADVANCED_GENERIC_TWO_STATE_SWITCH
        | device_id::GENERIC_SWITCH => SWITCH_CLUSTERS,
        device_id::LEVEL_CONTROL_SWITCH => LEVEL_SWITCH_CLUSTERS,
        device_id::COLOR_DIMMER_SWITCH => COLOR_DIMMER_CLUSTERS,
        device_id::DOOR_LOCK_CONTROLLER => DOOR_LOCK_CLUSTERS,
        device_id::LIGHT_SENSOR => LIGHT_SENSOR_CLUSTERS,
        device_id::OCCUPANCY_SENSOR => OCCUPANCY_SENSOR_CLUSTERS,
        device_id::TEMPERATURE_SENSOR => TEMPERATURE_SENSOR_CLUSTERS,
        device_id::PRESSURE_SENSOR => PRESSURE_SENSOR_CLUSTERS,
        device_id::FLOW_SENSOR => FLOW_SENSOR_CLUSTERS,
        device_id::ENVIRONMENT_SENSOR => ENVIRONMENT_SENSOR_CLUSTERS,
        _ => &[],
    }
}

/// Sink side cluster of a GPD command
///
/// `cluster::RESERVED` means the cluster depends on the device or the
/// payload, `None` that the command has no cluster.
pub fn command_cluster(command: u8) -> Option<ClusterSide> {
    use gpd_command::*;
    match command {
        IDENTIFY => Some((cluster::IDENTIFY, true)),
        RECALL_SCENE_0..=STORE_SCENE_7 => Some((cluster::SCENES, true)),
        OFF..=TOGGLE => Some((cluster::ON_OFF, true)),
        MOVE_UP..=STEP_DOWN_WITH_ON_OFF => Some((cluster::LEVEL_CONTROL, true)),
        MOVE_HUE_STOP..=STEP_COLOR => Some((cluster::COLOR_CONTROL, true)),
        LOCK_DOOR | UNLOCK_DOOR => Some((cluster::DOOR_LOCK, true)),
        PRESS_1_OF_1..=GENERIC_SWITCH_RELEASE => Some((cluster::ON_OFF, true)),
        ATTRIBUTE_REPORTING..=MANUFACTURER_MULTI_CLUSTER_REPORTING
        | ZCL_TUNNELING
        | ANY_SENSOR_COMMAND => Some((cluster::RESERVED, false)),
        _ => None,
    }
}
