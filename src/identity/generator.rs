use crate::identity::archetype::{Archetype, ARCHETYPES};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Browser window size presented by a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// User-agent client hints (`Sec-CH-UA*`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformHints {
    /// Full `Sec-CH-UA` brand list; `None` for browsers that do not send hints
    pub brands: Option<String>,
    pub mobile: bool,
    pub platform: String,
}

/// A coherent set of client-identifying signals
///
/// Immutable once generated; shared only by the host session that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityProfile {
    /// Archetype the profile was derived from
    pub archetype: &'static str,
    pub user_agent: String,
    pub accept: String,
    pub accept_encoding: String,
    /// Locales in preference order, as listed in `accept_language`
    pub locales: Vec<String>,
    pub accept_language: String,
    pub viewport: Viewport,
    pub platform_hints: PlatformHints,
    /// Whether the browser sends `Sec-Fetch-*` metadata
    pub sec_fetch: bool,
    pub send_cache_control: bool,
    pub send_pragma: bool,
    pub send_dnt: bool,
}

/// Draws identity profiles from a shuffled, rotating archetype deck
///
/// The random source is injected so a fixed seed reproduces the exact same
/// sequence of profiles.
#[derive(Debug)]
pub struct IdentityGenerator {
    rng: StdRng,
    deck: Vec<usize>,
    cursor: usize,
}

impl IdentityGenerator {
    /// Creates a generator, seeded for reproducibility or from entropy
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut generator = Self {
            rng,
            deck: (0..ARCHETYPES.len()).collect(),
            cursor: 0,
        };
        generator.deck.shuffle(&mut generator.rng);
        generator
    }

    /// Generates the next profile, reshuffling once the deck is exhausted
    pub fn generate(&mut self) -> IdentityProfile {
        if self.cursor >= self.deck.len() {
            self.deck.shuffle(&mut self.rng);
            self.cursor = 0;
        }

        let archetype = &ARCHETYPES[self.deck[self.cursor]];
        self.cursor += 1;

        derive_profile(archetype, &mut self.rng)
    }
}

/// Derives a concrete profile from an archetype
///
/// Pure with respect to `rng`: the same archetype and RNG state always
/// produce the same profile.
pub fn derive_profile<R: Rng + ?Sized>(archetype: &Archetype, rng: &mut R) -> IdentityProfile {
    let major = rng.gen_range(archetype.versions.0..=archetype.versions.1);
    let locales = pick_locales(archetype.locales, rng);
    let accept_language = accept_language(&locales, rng);

    // Even widths only; odd window sizes are rare in the wild
    let width = rng.gen_range(archetype.viewport_widths.0..=archetype.viewport_widths.1) & !1;
    let height = rng.gen_range(archetype.viewport_heights.0..=archetype.viewport_heights.1);

    let brands = archetype.browser.brand().map(|brand| {
        format!(
            "\"Chromium\";v=\"{major}\", \"{brand}\";v=\"{major}\", \"Not_A Brand\";v=\"8\""
        )
    });

    let send_cache_control = rng.gen_bool(0.3);
    let send_pragma = send_cache_control && rng.gen_bool(0.5);
    let send_dnt = archetype.browser.brand().is_none() && rng.gen_bool(0.2);

    IdentityProfile {
        archetype: archetype.name,
        user_agent: archetype.user_agent(major),
        accept: archetype.accept().to_string(),
        accept_encoding: "gzip, deflate, br".to_string(),
        locales,
        accept_language,
        viewport: Viewport { width, height },
        platform_hints: PlatformHints {
            brands,
            mobile: archetype.is_mobile(),
            platform: archetype.platform.to_string(),
        },
        sec_fetch: true,
        send_cache_control,
        send_pragma,
        send_dnt,
    }
}

/// Primary locale, its bare language, and an English fallback when needed
fn pick_locales<R: Rng + ?Sized>(candidates: &[&str], rng: &mut R) -> Vec<String> {
    let primary = candidates.choose(rng).copied().unwrap_or("en-US");
    let language = primary.split('-').next().unwrap_or(primary);

    let mut locales = vec![primary.to_string()];
    if language != primary {
        locales.push(language.to_string());
    }
    if language != "en" {
        locales.push("en-US".to_string());
        locales.push("en".to_string());
    }
    locales
}

/// Builds an `Accept-Language` value with jittered, strictly decreasing q-values
///
/// Entry `i > 0` gets `q = 0.90 - 0.10 * (i - 1) - jitter` with jitter in
/// `[0, 0.05]`, so consecutive values never collide.
fn accept_language<R: Rng + ?Sized>(locales: &[String], rng: &mut R) -> String {
    locales
        .iter()
        .enumerate()
        .map(|(i, locale)| {
            if i == 0 {
                locale.clone()
            } else {
                let hundredths = 90 - 10 * (i as u32 - 1) - rng.gen_range(0..=5);
                format!("{};q=0.{:02}", locale, hundredths)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
