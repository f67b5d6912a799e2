use drivelink_core::LinkView;
use minijinja::{Environment, context};

const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>{% block title %}{% endblock %}</title>
<style>
body { font-family: -apple-system, 'PingFang SC', 'Microsoft YaHei', sans-serif; background: #f5f6f8; margin: 0; padding: 24px; }
.card { max-width: 420px; margin: 40px auto; background: #fff; border-radius: 12px; padding: 24px; box-shadow: 0 2px 12px rgba(0,0,0,.08); }
h1 { font-size: 20px; margin: 0 0 16px; }
dl { display: grid; grid-template-columns: auto 1fr; gap: 6px 12px; margin: 0 0 16px; }
dt { color: #888; }
dd { margin: 0; }
input { width: 100%; box-sizing: border-box; padding: 10px; margin: 8px 0; border: 1px solid #ddd; border-radius: 8px; }
button { width: 100%; padding: 10px; border: 0; border-radius: 8px; background: #2f6bff; color: #fff; font-size: 16px; }
.error { color: #d93026; }
.result { margin-top: 12px; min-height: 1em; }
</style>
</head>
<body>{% block body %}{% endblock %}</body>
</html>
"#;

const ERROR_PAGE: &str = r#"{% extends "layout.html" %}
{% block title %}外链不可用{% endblock %}
{% block body %}<div class="card"><h1>外链不可用</h1><p class="error">{{ message }}</p></div>{% endblock %}
"#;

const VIEW_PAGE: &str = r#"{% extends "layout.html" %}
{% block title %}外链登录{% endblock %}
{% block body %}<div class="card">
<h1>{{ provider_name }}</h1>
<dl>
{% for field in display %}<dt>{{ field.label }}</dt><dd>{{ field.value }}</dd>
{% endfor %}<dt>剩余次数</dt><dd id="remaining">{{ remaining }}</dd>
<dt>过期时间</dt><dd>{{ expiry_time }}</dd>
{% if remarks %}<dt>备注</dt><dd>{{ remarks }}</dd>
{% endif %}</dl>
<input id="token" placeholder="粘贴扫码得到的token" autocomplete="off">
<button id="submit">登录</button>
<div id="result" class="result"></div>
</div>
<script>
const linkUuid = {{ link_uuid|tojson }};
document.getElementById('submit').addEventListener('click', async () => {
  const token = document.getElementById('token').value.trim();
  const out = document.getElementById('result');
  if (!token) { out.textContent = '缺少token参数'; out.className = 'result error'; return; }
  const res = await fetch('/login', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ token: token, link_uuid: linkUuid })
  });
  const data = await res.json();
  out.className = data.status ? 'result' : 'result error';
  out.textContent = data.status ? '登录成功' : (data.message || '登录失败');
  if (typeof data.remaining === 'number') { document.getElementById('remaining').textContent = data.remaining; }
});
</script>
{% endblock %}
"#;

/// `.html` names turn on minijinja's HTML auto-escaping.
fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("layout.html", LAYOUT)?;
    env.add_template("error.html", ERROR_PAGE)?;
    env.add_template("view.html", VIEW_PAGE)?;
    Ok(env)
}

/// Quotas are rationals in storage but whole numbers in practice.
pub(crate) fn format_quota(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

pub(crate) fn error_page(message: &str) -> Result<String, minijinja::Error> {
    environment()?
        .get_template("error.html")?
        .render(context! { message => message })
}

pub(crate) fn view_page(view: &LinkView) -> Result<String, minijinja::Error> {
    let remarks = view.remarks.as_deref().filter(|r| !r.is_empty());
    environment()?.get_template("view.html")?.render(context! {
        provider_name => &view.provider_name,
        display => &view.display,
        remaining => format_quota(view.remaining),
        expiry_time => &view.expiry_time,
        remarks => remarks,
        link_uuid => &view.link_uuid,
    })
}
