//! Catalogue of browser archetypes profiles are derived from

/// Form factor of the emulated device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Desktop,
    Mobile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    MacOs,
    Linux,
    Android,
    Ios,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserFamily {
    Chrome,
    Edge,
    Firefox,
    Safari,
}

impl BrowserFamily {
    /// Chromium-based browsers send `Sec-CH-UA` client hints
    pub fn sends_client_hints(self) -> bool {
        matches!(self, Self::Chrome | Self::Edge)
    }

    /// Brand name used in `Sec-CH-UA`
    pub fn brand(self) -> Option<&'static str> {
        match self {
            Self::Chrome => Some("Google Chrome"),
            Self::Edge => Some("Microsoft Edge"),
            Self::Firefox | Self::Safari => None,
        }
    }
}

/// A realistic browser/OS/device combination
///
/// `ua_template` contains a `{major}` placeholder substituted with a version
/// drawn from `versions`.
#[derive(Debug, Clone, Copy)]
pub struct Archetype {
    pub name: &'static str,
    pub device: DeviceClass,
    pub os: OsFamily,
    pub browser: BrowserFamily,
    pub ua_template: &'static str,
    pub versions: (u32, u32),
    pub locales: &'static [&'static str],
    pub viewport_widths: (u32, u32),
    pub viewport_heights: (u32, u32),
    /// Value of `Sec-CH-UA-Platform` (unquoted)
    pub platform: &'static str,
}

impl Archetype {
    pub fn is_mobile(&self) -> bool {
        self.device == DeviceClass::Mobile
    }

    /// Renders the user agent for a concrete major version
    pub fn user_agent(&self, major: u32) -> String {
        self.ua_template.replace("{major}", &major.to_string())
    }

    /// Accept header this browser family sends for navigations
    pub fn accept(&self) -> &'static str {
        match self.browser {
            BrowserFamily::Chrome | BrowserFamily::Edge => {
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7"
            }
            BrowserFamily::Firefox => {
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
            }
            BrowserFamily::Safari => "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        }
    }
}

const WESTERN_LOCALES: &[&str] = &["en-US", "en-GB", "de-DE", "fr-FR", "es-ES", "it-IT", "nl-NL"];
const US_LOCALES: &[&str] = &["en-US", "en-CA", "es-US"];
const APPLE_LOCALES: &[&str] = &["en-US", "en-GB", "fr-FR", "de-DE", "ja-JP"];

pub const ARCHETYPES: &[Archetype] = &[
    Archetype {
        name: "chrome-windows",
        device: DeviceClass::Desktop,
        os: OsFamily::Windows,
        browser: BrowserFamily::Chrome,
        ua_template: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{major}.0.0.0 Safari/537.36",
        versions: (118, 124),
        locales: WESTERN_LOCALES,
        viewport_widths: (1280, 1920),
        viewport_heights: (720, 1080),
        platform: "Windows",
    },
    Archetype {
        name: "edge-windows",
        device: DeviceClass::Desktop,
        os: OsFamily::Windows,
        browser: BrowserFamily::Edge,
        ua_template: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{major}.0.0.0 Safari/537.36 Edg/{major}.0.0.0",
        versions: (118, 124),
        locales: US_LOCALES,
        viewport_widths: (1280, 1920),
        viewport_heights: (720, 1080),
        platform: "Windows",
    },
    Archetype {
        name: "firefox-windows",
        device: DeviceClass::Desktop,
        os: OsFamily::Windows,
        browser: BrowserFamily::Firefox,
        ua_template: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:{major}.0) Gecko/20100101 Firefox/{major}.0",
        versions: (115, 125),
        locales: WESTERN_LOCALES,
        viewport_widths: (1280, 1920),
        viewport_heights: (720, 1080),
        platform: "Windows",
    },
    Archetype {
        name: "chrome-macos",
        device: DeviceClass::Desktop,
        os: OsFamily::MacOs,
        browser: BrowserFamily::Chrome,
        ua_template: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{major}.0.0.0 Safari/537.36",
        versions: (118, 124),
        locales: APPLE_LOCALES,
        viewport_widths: (1280, 1728),
        viewport_heights: (760, 1117),
        platform: "macOS",
    },
    Archetype {
        name: "safari-macos",
        device: DeviceClass::Desktop,
        os: OsFamily::MacOs,
        browser: BrowserFamily::Safari,
        ua_template: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/{major}.0 Safari/605.1.15",
        versions: (16, 17),
        locales: APPLE_LOCALES,
        viewport_widths: (1280, 1728),
        viewport_heights: (760, 1117),
        platform: "macOS",
    },
    Archetype {
        name: "firefox-linux",
        device: DeviceClass::Desktop,
        os: OsFamily::Linux,
        browser: BrowserFamily::Firefox,
        ua_template: "Mozilla/5.0 (X11; Linux x86_64; rv:{major}.0) Gecko/20100101 Firefox/{major}.0",
        versions: (115, 125),
        locales: WESTERN_LOCALES,
        viewport_widths: (1366, 1920),
        viewport_heights: (768, 1080),
        platform: "Linux",
    },
    Archetype {
        name: "chrome-android",
        device: DeviceClass::Mobile,
        os: OsFamily::Android,
        browser: BrowserFamily::Chrome,
        ua_template: "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{major}.0.0.0 Mobile Safari/537.36",
        versions: (118, 124),
        locales: WESTERN_LOCALES,
        viewport_widths: (360, 412),
        viewport_heights: (740, 915),
        platform: "Android",
    },
    Archetype {
        name: "safari-ios",
        device: DeviceClass::Mobile,
        os: OsFamily::Ios,
        browser: BrowserFamily::Safari,
        ua_template: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/{major}.0 Mobile/15E148 Safari/604.1",
        versions: (16, 17),
        locales: APPLE_LOCALES,
        viewport_widths: (375, 430),
        viewport_heights: (667, 932),
        platform: "iOS",
    },
];
