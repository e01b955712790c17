//! Stealth profile construction for browser contexts.
//!
//! Everything here is a pure data builder plus one CDP injection script; no
//! network or process state lives in this module.

use rand::seq::IndexedRandom;

/// Viewport sizes we're willing to present. Anything outside this set is a
/// giveaway for automation, so contexts only ever pick from here.
pub const VIEWPORTS: &[(u32, u32)] = &[
    (1920, 1080),
    (1536, 864),
    (1366, 768),
    (1440, 900),
    (2560, 1440),
];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

#[derive(Debug, Clone)]
pub struct StealthProfile {
    pub user_agent: &'static str,
    pub viewport: (u32, u32),
    pub locale: &'static str,
    pub timezone: &'static str,
}

impl StealthProfile {
    pub fn random() -> Self {
        let mut rng = rand::rng();
        Self {
            user_agent: USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0]),
            viewport: *VIEWPORTS.choose(&mut rng).unwrap_or(&VIEWPORTS[0]),
            locale: "en-GB",
            timezone: "Europe/London",
        }
    }

    /// Script injected via `Page.addScriptToEvaluateOnNewDocument` before any
    /// page script runs, hiding the most common headless-Chrome fingerprints.
    pub fn init_script(&self) -> String {
        format!(
            r#"
Object.defineProperty(navigator, 'webdriver', {{ get: () => undefined }});
Object.defineProperty(navigator, 'languages', {{ get: () => ['en-GB', 'en'] }});
Object.defineProperty(navigator, 'plugins', {{ get: () => [1, 2, 3, 4, 5] }});
Object.defineProperty(navigator, 'hardwareConcurrency', {{ get: () => 8 }});
Object.defineProperty(navigator, 'deviceMemory', {{ get: () => 8 }});

const getParameter = WebGLRenderingContext.prototype.getParameter;
WebGLRenderingContext.prototype.getParameter = function(parameter) {{
    if (parameter === 37445) return 'Intel Inc.';
    if (parameter === 37446) return 'Intel Iris OpenGL Engine';
    return getParameter.apply(this, [parameter]);
}};

const origGetImageData = CanvasRenderingContext2D.prototype.getImageData;
CanvasRenderingContext2D.prototype.getImageData = function(...args) {{
    const data = origGetImageData.apply(this, args);
    for (let i = 0; i < data.data.length; i += 97) {{
        data.data[i] = data.data[i] ^ 1;
    }}
    return data;
}};

const origCreateAnalyser = (typeof AudioContext !== 'undefined' && AudioContext.prototype.createAnalyser)
    ? AudioContext.prototype.createAnalyser
    : undefined;
if (origCreateAnalyser) {{
    AudioContext.prototype.createAnalyser = function(...args) {{
        const analyser = origCreateAnalyser.apply(this, args);
        const origGetFloatFrequencyData = analyser.getFloatFrequencyData;
        analyser.getFloatFrequencyData = function(arr) {{
            origGetFloatFrequencyData.apply(this, [arr]);
            for (let i = 0; i < arr.length; i++) {{ arr[i] += Math.random() * 0.0001; }}
        }};
        return analyser;
    }};
}}
"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_profile_picks_known_viewport() {
        let profile = StealthProfile::random();
        assert!(VIEWPORTS.contains(&profile.viewport));
    }

    #[test]
    fn init_script_hides_webdriver_flag() {
        let profile = StealthProfile::random();
        assert!(profile.init_script().contains("webdriver"));
    }
}
