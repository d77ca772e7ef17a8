// src/signup/driver.rs
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::webdriver::{ElementId, Result, WebDriver};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How a registration form element is addressed on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locator {
    Name(&'static str),
    Id(&'static str),
}

impl Locator {
    pub fn css(&self) -> String {
        match self {
            Locator::Name(n) => format!(r#"[name="{n}"]"#),
            Locator::Id(id) => format!(r#"[id="{id}"]"#),
        }
    }
}

/// Browser operations the registration flow relies on.
/// Lookups return empty results for absent elements instead of failing.
#[async_trait]
pub trait FormDriver: Send + Sync {
    type Element: Send + Sync;

    async fn goto(&self, url: &str) -> Result<()>;
    async fn find_all(&self, locator: Locator) -> Result<Vec<Self::Element>>;
    async fn send_keys(&self, el: &Self::Element, text: &str) -> Result<()>;
    async fn clear(&self, el: &Self::Element) -> Result<()>;
    async fn click(&self, el: &Self::Element) -> Result<()>;
}

#[async_trait]
impl FormDriver for WebDriver {
    type Element = ElementId;

    async fn goto(&self, url: &str) -> Result<()> {
        WebDriver::goto(self, url).await
    }

    async fn find_all(&self, locator: Locator) -> Result<Vec<ElementId>> {
        WebDriver::find_all(self, &locator.css()).await
    }

    async fn send_keys(&self, el: &ElementId, text: &str) -> Result<()> {
        WebDriver::send_keys(self, el, text).await
    }

    async fn clear(&self, el: &ElementId) -> Result<()> {
        WebDriver::clear(self, el).await
    }

    async fn click(&self, el: &ElementId) -> Result<()> {
        WebDriver::click(self, el).await
    }
}

/// First element matching `locator`, polling until `within` has elapsed.
pub async fn wait_for<D>(driver: &D, locator: Locator, within: Duration) -> Result<Option<D::Element>>
where
    D: FormDriver + ?Sized,
{
    let deadline = Instant::now() + within;
    loop {
        if let Some(el) = driver.find_all(locator).await?.into_iter().next() {
            return Ok(Some(el));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locators_render_attribute_selectors() {
        assert_eq!(
            Locator::Name("user[email]").css(),
            r#"[name="user[email]"]"#
        );
        assert_eq!(Locator::Id("user_agreement").css(), r#"[id="user_agreement"]"#);
    }
}
