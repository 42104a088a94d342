mod access;
mod activity;
mod assets;
mod comments;
mod invites;
mod projects;
mod users;
