mod listing;
mod login;
mod record_detail;

pub use listing::ListingView;
pub use login::LoginView;
pub use record_detail::RecordDetailView;

use crate::app::AppContext;
use crate::ui::view::View;
use color_eyre::Result;

/// Listing view for a configured resource
pub fn resource_view(ctx: &AppContext, name: &str) -> Result<Box<dyn View>> {
  let resource = ctx.config.resource(name)?.clone();
  Ok(Box::new(ListingView::new(
    ctx.clone(),
    name.to_lowercase(),
    resource,
  )))
}

/// Root view on startup and after login: the login prompt when there is no
/// session, otherwise the default resource
pub fn startup_view(ctx: &AppContext) -> Option<Box<dyn View>> {
  if !ctx.session.is_logged_in() {
    return Some(Box::new(LoginView::new(ctx.clone())));
  }
  let name = ctx.config.startup_resource()?;
  resource_view(ctx, &name).ok()
}
