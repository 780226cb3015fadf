//! Soft access point the host joins.
//!
//! The device is the network: it runs an open AP and the host connects
//! to it as a station.  The dispatcher is not started until at least one
//! station is associated, otherwise the first replies go nowhere.

use std::time::Duration;

use anyhow::anyhow;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::{ESP_OK, esp_wifi_ap_get_sta_list, wifi_sta_list_t};
use esp_idf_svc::wifi::{AccessPointConfiguration, AuthMethod, BlockingWifi, Configuration, EspWifi};
use log::info;

pub struct AccessPoint {
    // Dropping the driver takes the AP down.
    _wifi: BlockingWifi<EspWifi<'static>>,
}

impl AccessPoint {
    /// Configure and start an open AP on `channel`.
    pub fn start(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        ssid: &str,
        channel: u8,
    ) -> anyhow::Result<Self> {
        let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), Some(nvs))?, sysloop)?;
        wifi.set_configuration(&Configuration::AccessPoint(AccessPointConfiguration {
            ssid: ssid.try_into().map_err(|_| anyhow!("SSID longer than 32 bytes"))?,
            channel,
            auth_method: AuthMethod::None,
            ..Default::default()
        }))?;
        wifi.start()?;
        wifi.wait_netif_up()?;

        let ip = wifi.wifi().ap_netif().get_ip_info()?;
        info!("access point '{ssid}' up on channel {channel}, address {}", ip.ip);
        Ok(Self { _wifi: wifi })
    }

    /// Associated stations, 0 if the driver cannot be queried.
    pub fn station_count(&self) -> usize {
        let mut list = wifi_sta_list_t::default();
        // SAFETY: the driver is started; `list` outlives the call.
        let ret = unsafe { esp_wifi_ap_get_sta_list(&mut list) };
        if ret == ESP_OK as i32 { list.num.max(0) as usize } else { 0 }
    }

    /// Block until a station has joined.
    pub fn wait_for_station(&self, poll: Duration) {
        info!("waiting for a station to join");
        while self.station_count() == 0 {
            FreeRtos::delay_ms(poll.as_millis() as u32);
        }
        info!("station joined");
    }
}
