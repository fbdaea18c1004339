/// Hardware and OS descriptor snapshots stored on a capture session.
///
/// Each descriptor is populated once, at live-session construction, when the
/// hardware-detection feature is enabled.  The session stores and republishes
/// them; it never interprets their contents.  GPU data has no portable
/// detection path, so [`GpuInformation`] is filled in by an external provider
/// through the session setter and otherwise stays at its defaults.
use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuInformation {
    pub vendor: String,
    pub brand: String,
    pub physical_cores: usize,
    pub logical_cores: usize,
    pub frequency_mhz: u64,
}

impl CpuInformation {
    pub fn detect() -> Self {
        let sys = System::new_all();
        let cpus = sys.cpus();
        let first = cpus.first();
        Self {
            vendor: first.map(|c| c.vendor_id().to_string()).unwrap_or_default(),
            brand: first.map(|c| c.brand().to_string()).unwrap_or_default(),
            physical_cores: System::physical_core_count().unwrap_or(0),
            logical_cores: cpus.len(),
            frequency_mhz: first.map(|c| c.frequency()).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuInformation {
    pub vendor: String,
    pub model: String,
    pub driver_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskEntry {
    pub name: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskInformation {
    pub disks: Vec<DiskEntry>,
}

impl DiskInformation {
    pub fn detect() -> Self {
        let list = Disks::new_with_refreshed_list();
        let disks = list
            .list()
            .iter()
            .map(|disk| DiskEntry {
                name: disk.name().to_string_lossy().into_owned(),
                total_bytes: disk.total_space(),
                available_bytes: disk.available_space(),
            })
            .collect();
        Self { disks }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsInformation {
    pub name: String,
    pub version: String,
    pub kernel_version: String,
    pub host_name: String,
}

impl OsInformation {
    pub fn detect() -> Self {
        Self {
            name: System::name().unwrap_or_default(),
            version: System::os_version().unwrap_or_default(),
            kernel_version: System::kernel_version().unwrap_or_default(),
            host_name: System::host_name().unwrap_or_default(),
        }
    }
}
