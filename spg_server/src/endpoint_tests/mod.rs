mod helpers;
mod orders;
mod status;
mod webhooks;
