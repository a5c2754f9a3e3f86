pub mod chrome_page;
pub mod page_driver;

pub use chrome_page::{ChromeDriverFactory, ChromePage};
pub use page_driver::{DriverError, DriverFactory, PageDriver};
